//! Global Otsu threshold for rectified patches.

/// Otsu threshold over 8-bit samples; a pixel is foreground iff `value > t`.
///
/// Degenerate inputs: empty gives 127, a constant image gives its value, and
/// two distinct levels give their midpoint. Ties go to the lowest threshold.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    let hist = samples.iter().fold([0u64; 256], |mut hist, &v| {
        hist[v as usize] += 1;
        hist
    });

    let mut levels = (0..=255u8).filter(|&v| hist[v as usize] > 0);
    match (levels.next(), levels.next(), levels.next()) {
        (None, _, _) => return 127,
        (Some(only), None, _) => return only,
        (Some(lo), Some(hi), None) => return ((lo as u16 + hi as u16) / 2) as u8,
        _ => {}
    }

    let n = samples.len() as u64;
    let total = n as f64;
    let mean = hist
        .iter()
        .zip(0u64..)
        .map(|(&h, v)| h * v)
        .sum::<u64>() as f64
        / total;

    // (threshold, pixels <= threshold, their summed intensity)
    hist.iter()
        .zip(0u64..)
        .scan((0u64, 0u64), |(count, moment), (&h, v)| {
            *count += h;
            *moment += h * v;
            Some((v as u8, *count, *moment))
        })
        .filter(|&(_, count, _)| count > 0 && count < n)
        .map(|(t, count, moment)| {
            let omega = count as f64 / total;
            let spread = mean * omega - moment as f64 / total;
            (t, spread * spread / (omega * (1.0 - omega)))
        })
        .fold((127u8, f64::NEG_INFINITY), |best, (t, var)| {
            if var > best.1 {
                (t, var)
            } else {
                best
            }
        })
        .0
}
