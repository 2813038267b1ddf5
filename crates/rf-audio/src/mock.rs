//! File-backed mock audio source, pacing decoded samples in wall-clock time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rf_dsp::{ChromaExtractor, FrameBuilder};

use crate::queue::{self, FeatureConsumer, FeatureProducer};
use crate::source::{process_chunk, AudioSource, SourceConfig};
use crate::{AudioError, AudioResult};

/// Fraction of the decoded file's length appended as trailing silence, so
/// the follower has room to settle on the final reference frames instead of
/// hitting EOF mid-note.
const SILENCE_PADDING_RATIO: f32 = 0.10;

/// Replays a WAV file as if it were a live input device: decodes once,
/// right-pads with silence, and emits chunk-aligned windows at the same
/// cadence a real device callback would.
pub struct MockFileSource {
    path: PathBuf,
    config: SourceConfig,
    pending_producer: Option<FeatureProducer>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MockFileSource {
    pub fn new<P: AsRef<Path>>(path: P, config: SourceConfig) -> AudioResult<(Self, FeatureConsumer)> {
        let (producer, consumer) = queue::channel(4096);
        let source = Self {
            path: path.as_ref().to_path_buf(),
            config,
            pending_producer: Some(producer),
            cancelled: Arc::new(AtomicBool::new(false)),
            worker: None,
        };
        Ok((source, consumer))
    }

    fn decode(&self) -> AudioResult<Vec<f32>> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| AudioError::DecodeError(e.to_string()))?;
        let spec = reader.spec();

        if spec.sample_rate != self.config.sample_rate {
            return Err(AudioError::DecodeError(format!(
                "file sample rate {} does not match configured rate {}",
                spec.sample_rate, self.config.sample_rate
            )));
        }

        let channels = spec.channels as usize;
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| AudioError::DecodeError(e.to_string()))?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|e| AudioError::DecodeError(e.to_string()))?
            }
        };

        let mono: Vec<f32> = if channels <= 1 {
            samples
        } else {
            samples
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(mono)
    }
}

impl AudioSource for MockFileSource {
    fn start(&mut self) -> AudioResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let mut samples = self.decode()?;
        let pad_len = (samples.len() as f32 * SILENCE_PADDING_RATIO) as usize;
        samples.extend(std::iter::repeat(0.0).take(pad_len));

        let chunk_size = self.config.chunk_size();
        let remainder = samples.len() % chunk_size;
        if remainder != 0 {
            samples.extend(std::iter::repeat(0.0).take(chunk_size - remainder));
        }

        let mut producer = self
            .pending_producer
            .take()
            .ok_or_else(|| AudioError::StreamError("source already started once".into()))?;
        let eof = producer.eof_handle();
        let cancelled = Arc::clone(&self.cancelled);
        let sleep_duration =
            Duration::from_secs_f64(chunk_size as f64 / self.config.sample_rate as f64);
        let hop_length = self.config.hop_length;
        let sample_rate = self.config.sample_rate;
        let feature_type = self.config.feature_type;

        let worker = thread::spawn(move || {
            let mut frame_builder = FrameBuilder::new(hop_length);
            let mut extractor = match ChromaExtractor::new(hop_length * 2, sample_rate, feature_type)
            {
                Ok(extractor) => extractor,
                Err(_) => return,
            };

            for chunk in samples.chunks(chunk_size) {
                if cancelled.load(Ordering::Acquire) {
                    break;
                }
                process_chunk(chunk, hop_length, &mut frame_builder, &mut extractor, &mut producer);
                thread::sleep(sleep_duration);
            }
            eof.close();
        });

        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for MockFileSource {
    fn drop(&mut self) {
        self.stop();
    }
}
