use quadmark_core::CameraError;

/// A [`DetectorParams`](super::DetectorParams) value the pipeline cannot run with.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ParamsError {
    #[error("adaptive_window must be odd and >= 3, got {window}")]
    InvalidWindow { window: usize },
    #[error("adaptive_c must be finite, got {c}")]
    NonFiniteOffset { c: f64 },
    #[error("poly_epsilon_rel must be positive, got {value}")]
    NonPositiveEpsilon { value: f64 },
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidDistance { field: &'static str, value: f32 },
    #[error("patch_size must be at least {min} px, got {size}")]
    PatchTooSmall { size: usize, min: usize },
    #[error("subpix half_window and max_iters must be non-zero (got {half_window}, {max_iters})")]
    EmptySubpixSearch { half_window: usize, max_iters: usize },
    #[error("subpix epsilon must be finite and non-negative, got {epsilon}")]
    InvalidSubpixEpsilon { epsilon: f32 },
    #[error("marker_length must be positive, got {length}")]
    NonPositiveMarkerLength { length: f64 },
}

/// Errors returned by [`MarkerDetector`](super::MarkerDetector).
///
/// Per-candidate failures never surface here; they only drop the candidate.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("frame buffer has {got} bytes, expected {expected}")]
    InvalidFrameBuffer { expected: usize, got: usize },
    #[error("frame dimensions {width}x{height} overflow the address space")]
    FrameTooLarge { width: usize, height: usize },
    #[error("invalid detector parameters: {0}")]
    InvalidParams(#[from] ParamsError),
    #[error("invalid camera model: {0}")]
    InvalidCamera(#[from] CameraError),
}
