//! rf-audio: audio capture and feature-queue plumbing for score following.
//!
//! Two interchangeable [`source::AudioSource`] implementations — [`live::LiveSource`]
//! (cpal device capture) and [`mock::MockFileSource`] (paced file playback) —
//! both feed a [`queue::FeatureConsumer`] the engine pulls from. Device
//! enumeration in [`device`] is exposed for callers that want to pick a
//! non-default input.

mod device;
mod error;
mod live;
mod mock;
mod queue;
mod source;

pub use device::{get_default_input_device, get_host, get_input_device_by_name, list_input_devices, DeviceInfo};
pub use error::{AudioError, AudioResult};
pub use live::LiveSource;
pub use mock::MockFileSource;
pub use queue::{channel, FeatureConsumer, FeatureFrame, FeatureProducer, QueueItem};
pub use source::{AudioSource, SourceConfig};
