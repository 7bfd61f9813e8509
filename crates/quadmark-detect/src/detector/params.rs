use super::ParamsError;
use crate::refine::SubpixParams;
use quadmark_decode::CELLS;
use serde::{Deserialize, Serialize};

/// Configuration for [`MarkerDetector`](super::MarkerDetector).
///
/// Every field has a default, so a JSON file only needs to name what it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Side of the Gaussian adaptive-threshold window (odd, >= 3).
    pub adaptive_window: usize,
    /// Offset subtracted from the local mean before comparing.
    pub adaptive_c: f64,
    /// Contours with fewer border pixels are ignored.
    pub min_contour_points: usize,
    /// Polygon tolerance as a fraction of the contour perimeter.
    pub poly_epsilon_rel: f64,
    /// Candidates with two adjacent corners closer than this (squared px)
    /// are rejected.
    pub min_corner_dist_sq: f32,
    /// Candidates whose mean squared corner distance is below this are
    /// near-duplicates.
    pub near_dist_sq: f32,
    /// Side of the rectified patch in pixels.
    pub patch_size: usize,
    pub subpix: SubpixParams,
    /// Edge length of the printed black square; poses are reported in this unit.
    pub marker_length: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_window: 7,
            adaptive_c: 7.0,
            min_contour_points: 200,
            poly_epsilon_rel: 0.05,
            min_corner_dist_sq: 100.0,
            near_dist_sq: 100.0,
            patch_size: 100,
            subpix: SubpixParams::default(),
            marker_length: 0.026,
        }
    }
}

impl DetectorParams {
    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.adaptive_window < 3 || self.adaptive_window % 2 == 0 {
            return Err(ParamsError::InvalidWindow {
                window: self.adaptive_window,
            });
        }
        if !self.adaptive_c.is_finite() {
            return Err(ParamsError::NonFiniteOffset { c: self.adaptive_c });
        }
        if !(self.poly_epsilon_rel.is_finite() && self.poly_epsilon_rel > 0.0) {
            return Err(ParamsError::NonPositiveEpsilon {
                value: self.poly_epsilon_rel,
            });
        }
        for (field, value) in [
            ("min_corner_dist_sq", self.min_corner_dist_sq),
            ("near_dist_sq", self.near_dist_sq),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamsError::InvalidDistance { field, value });
            }
        }
        if self.patch_size < CELLS {
            return Err(ParamsError::PatchTooSmall {
                size: self.patch_size,
                min: CELLS,
            });
        }
        let SubpixParams {
            half_window,
            max_iters,
            epsilon,
        } = self.subpix;
        if half_window == 0 || max_iters == 0 {
            return Err(ParamsError::EmptySubpixSearch {
                half_window,
                max_iters,
            });
        }
        if !(epsilon.is_finite() && epsilon >= 0.0) {
            return Err(ParamsError::InvalidSubpixEpsilon { epsilon });
        }
        if !(self.marker_length.is_finite() && self.marker_length > 0.0) {
            return Err(ParamsError::NonPositiveMarkerLength {
                length: self.marker_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DetectorParams::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: DetectorParams =
            serde_json::from_str(r#"{ "marker_length": 0.05, "subpix": { "half_window": 3, "max_iters": 10, "epsilon": 0.05 } }"#)
                .expect("parse");
        assert_eq!(params.marker_length, 0.05);
        assert_eq!(params.subpix.half_window, 3);
        assert_eq!(params.adaptive_window, 7);
        assert_eq!(params.min_contour_points, 200);
    }

    #[test]
    fn rejects_even_window_and_tiny_patch() {
        let even = DetectorParams {
            adaptive_window: 8,
            ..DetectorParams::default()
        };
        assert_eq!(even.validate(), Err(ParamsError::InvalidWindow { window: 8 }));

        let tiny = DetectorParams {
            patch_size: 6,
            ..DetectorParams::default()
        };
        assert_eq!(
            tiny.validate(),
            Err(ParamsError::PatchTooSmall { size: 6, min: CELLS })
        );

        let flat = DetectorParams {
            marker_length: 0.0,
            ..DetectorParams::default()
        };
        assert_eq!(
            flat.validate(),
            Err(ParamsError::NonPositiveMarkerLength { length: 0.0 })
        );
    }

    #[test]
    fn errors_name_the_offending_field() {
        let negative = DetectorParams {
            near_dist_sq: -1.0,
            ..DetectorParams::default()
        };
        let err = negative.validate().expect_err("negative distance");
        assert_eq!(
            err,
            ParamsError::InvalidDistance {
                field: "near_dist_sq",
                value: -1.0
            }
        );
        assert!(err.to_string().starts_with("near_dist_sq"));

        let frozen = DetectorParams {
            subpix: SubpixParams {
                max_iters: 0,
                ..SubpixParams::default()
            },
            ..DetectorParams::default()
        };
        assert!(matches!(
            frozen.validate(),
            Err(ParamsError::EmptySubpixSearch { max_iters: 0, .. })
        ));
    }
}
