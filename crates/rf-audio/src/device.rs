//! Audio input device enumeration and selection.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfigRange};

use crate::{AudioError, AudioResult};

/// Audio input device information.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub input_channels: u16,
    pub sample_rates: Vec<u32>,
}

/// Selects the platform-preferred host backend.
///
/// CoreAudio on macOS, ASIO (falling back to WASAPI) on Windows, JACK
/// (falling back to the default) on Linux.
pub fn get_host() -> Host {
    #[cfg(target_os = "macos")]
    {
        cpal::default_host()
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(host) = cpal::available_hosts()
            .into_iter()
            .find(|h| *h == cpal::HostId::Asio)
        {
            if let Ok(host) = cpal::host_from_id(host) {
                return host;
            }
        }
        cpal::default_host()
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(host) = cpal::available_hosts()
            .into_iter()
            .find(|h| *h == cpal::HostId::Jack)
        {
            if let Ok(host) = cpal::host_from_id(host) {
                return host;
            }
        }
        cpal::default_host()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        cpal::default_host()
    }
}

/// Lists available input devices.
pub fn list_input_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = get_host();
    let default_device = host.default_input_device();
    let default_name = default_device.as_ref().and_then(|d| d.name().ok());

    let mut devices = Vec::new();

    for device in host
        .input_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if let Ok(name) = device.name() {
            let is_default = default_name.as_ref().map(|d| d == &name).unwrap_or(false);
            let (input_channels, sample_rates) = input_device_info(&device);

            devices.push(DeviceInfo {
                name,
                is_default,
                input_channels,
                sample_rates,
            });
        }
    }

    Ok(devices)
}

/// Returns the default input device.
pub fn get_default_input_device() -> AudioResult<Device> {
    let host = get_host();
    host.default_input_device().ok_or(AudioError::NoDevice)
}

/// Looks up an input device by name.
pub fn get_input_device_by_name(name: &str) -> AudioResult<Device> {
    let host = get_host();

    for device in host
        .input_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if let Ok(device_name) = device.name() {
            if device_name == name {
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}

fn input_device_info(device: &Device) -> (u16, Vec<u32>) {
    let configs: Vec<SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map(|c| c.collect())
        .unwrap_or_default();

    let max_channels = configs.iter().map(|c| c.channels()).max().unwrap_or(0);

    let mut sample_rates: Vec<u32> = configs
        .iter()
        .flat_map(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            [22050, 44100, 48000, 96000]
                .into_iter()
                .filter(move |&rate| rate >= min && rate <= max)
        })
        .collect();

    sample_rates.sort_unstable();
    sample_rates.dedup();

    (max_channels, sample_rates)
}
