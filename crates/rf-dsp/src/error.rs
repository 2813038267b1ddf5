//! Error type for the feature extraction crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfDspError {
    #[error("fft size must be a power of two, got {0}")]
    InvalidFftSize(usize),

    #[error("window length mismatch: expected {expected}, got {actual}")]
    WindowLengthMismatch { expected: usize, actual: usize },

    #[error("unsupported feature type: {0}")]
    UnsupportedFeature(String),
}

pub type RfDspResult<T> = Result<T, RfDspError>;
