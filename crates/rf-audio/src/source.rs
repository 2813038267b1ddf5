//! Shared contract for interchangeable audio sources.

use rf_dsp::{ChromaExtractor, FeatureType, FrameBuilder};

use crate::queue::FeatureProducer;
use crate::AudioResult;

/// Parameters common to every audio source implementation.
#[derive(Debug, Clone, Copy)]
pub struct SourceConfig {
    pub sample_rate: u32,
    pub hop_length: usize,
    pub frame_per_seg: usize,
    pub feature_type: FeatureType,
}

impl SourceConfig {
    /// Device/file buffer size: `frame_per_seg` hops per callback.
    pub fn chunk_size(&self) -> usize {
        self.frame_per_seg * self.hop_length
    }
}

/// Capability set shared by the live and mock-file sources. The engine
/// depends only on the `FeatureConsumer` it's handed at construction time,
/// never on this trait directly.
pub trait AudioSource {
    /// Clears the queue, acquires the underlying resource, and begins
    /// producing. Must not partially start: a failure here leaves no
    /// resource held.
    fn start(&mut self) -> AudioResult<()>;

    /// Halts production and releases the underlying resource. Idempotent.
    fn stop(&mut self);
}

/// Splits one audio chunk into `hop_length`-sized hops, extracts a feature
/// from each via the continuity-preserving [`FrameBuilder`], and enqueues
/// the result. Shared by the live and mock sources so the hop-carry-over
/// contract is implemented exactly once.
pub(crate) fn process_chunk(
    chunk: &[f32],
    hop_length: usize,
    frame_builder: &mut FrameBuilder,
    extractor: &mut ChromaExtractor,
    producer: &mut FeatureProducer,
) {
    for hop in chunk.chunks(hop_length) {
        if hop.len() != hop_length {
            // Trailing partial hop (can only happen at the very end of a
            // mock file's padded buffer); nothing useful to extract.
            continue;
        }
        let window = match frame_builder.push_hop(hop) {
            Ok(window) => window,
            Err(_) => continue,
        };
        if let Ok(chroma) = extractor.extract(&window) {
            producer.push(chroma);
        }
    }
}
