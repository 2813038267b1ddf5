//! rf-core: Shared types for the score-following engine.
//!
//! This crate provides the foundational types used by `rf-dsp`, `rf-audio`
//! and `rf-follow`: the feature-frame index and the chroma vector type.
//! Per-crate errors live in their own crates (`rf_dsp::RfDspError`,
//! `rf_audio::AudioError`, `rf_follow::FollowError`) since nothing in this
//! workspace shares an error path across crate boundaries.

mod sample;
mod time;

pub use sample::*;
pub use time::*;
