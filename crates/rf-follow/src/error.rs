//! Error type for the alignment engine and its driver.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FollowError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid reference features: {0}")]
    InvalidReference(String),

    #[error(transparent)]
    Audio(#[from] rf_audio::AudioError),
}

pub type FollowResult<T> = Result<T, FollowError>;
