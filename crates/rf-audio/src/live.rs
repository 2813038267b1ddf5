//! Live capture from a cpal input device.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use rf_dsp::{ChromaExtractor, FrameBuilder};

use crate::device::get_default_input_device;
use crate::queue::{self, EofSignal, FeatureConsumer, FeatureProducer};
use crate::source::{process_chunk, AudioSource, SourceConfig};
use crate::{AudioError, AudioResult};

/// Captures mono float32 audio from the default input device and feeds a
/// feature queue. The cpal [`Stream`] is held for as long as capture is
/// active; dropping it (on `stop` or on drop of this struct) releases the
/// device on every exit path.
pub struct LiveSource {
    device: Device,
    config: SourceConfig,
    stream: Option<Stream>,
    pending_producer: Option<FeatureProducer>,
    eof: EofSignal,
}

impl LiveSource {
    /// Opens the default input device (surfacing failure immediately,
    /// before any stream is built) and returns the source paired with the
    /// consumer end of its feature queue.
    pub fn new(config: SourceConfig) -> AudioResult<(Self, FeatureConsumer)> {
        let device = get_default_input_device()?;
        let (producer, consumer) = queue::channel(4096);
        let eof = producer.eof_handle();

        let source = Self {
            device,
            config,
            stream: None,
            pending_producer: Some(producer),
            eof,
        };

        Ok((source, consumer))
    }
}

impl AudioSource for LiveSource {
    fn start(&mut self) -> AudioResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mut producer = self
            .pending_producer
            .take()
            .ok_or_else(|| AudioError::StreamError("source already started once".into()))?;

        let supported = self
            .device
            .supported_input_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|c| {
                c.channels() >= 1
                    && c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate().0 <= self.config.sample_rate
                    && c.max_sample_rate().0 >= self.config.sample_rate
            })
            .ok_or(AudioError::UnsupportedSampleRate(self.config.sample_rate))?
            .with_sample_rate(cpal::SampleRate(self.config.sample_rate));

        let channels = supported.channels() as usize;
        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(self.config.chunk_size() as u32),
        };

        let hop_length = self.config.hop_length;
        let mut frame_builder = FrameBuilder::new(hop_length);
        let mut extractor = ChromaExtractor::new(
            hop_length * 2,
            self.config.sample_rate,
            self.config.feature_type,
        )
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;
        let mut mono_buf = Vec::new();
        let error_eof = self.eof.clone();

        let stream = self
            .device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let chunk = if channels == 1 {
                        data
                    } else {
                        mono_buf.clear();
                        mono_buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                        );
                        mono_buf.as_slice()
                    };
                    process_chunk(
                        chunk,
                        hop_length,
                        &mut frame_builder,
                        &mut extractor,
                        &mut producer,
                    );
                },
                move |err| {
                    // Mid-stream device error: production has stopped, so
                    // the queue must report EOF or the engine's consumer
                    // spins on `recv()` forever.
                    log::error!("input stream error: {}", err);
                    error_eof.close();
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream stops and closes the device.
        self.stream = None;
        self.eof.close();
    }
}

impl Drop for LiveSource {
    fn drop(&mut self) {
        self.stop();
    }
}
