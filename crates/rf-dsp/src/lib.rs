//! rf-dsp: Real-time audio feature extraction for score following.
//!
//! ## Modules
//! - `feature` - STFT-based chroma and chroma-decay extraction, with the
//!   hop-carry-over continuity contract the alignment engine depends on.
//! - `error` - `RfDspError`, the crate's `thiserror` enum.

pub mod error;
pub mod feature;

pub use error::{RfDspError, RfDspResult};
pub use feature::{ChromaExtractor, FeatureType, FrameBuilder};
