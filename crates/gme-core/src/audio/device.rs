//! Audio device enumeration and lookup
//!
//! Devices are enumerated from every available cpal host (ALSA, PulseAudio,
//! JACK, CoreAudio, WASAPI...) so a configured device can name any of them.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Display name for a host
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| host_name(*id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// An output device and what it can do
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Identifier usable in the config file
    pub id: DeviceId,
    pub name: String,
    /// Host backend name ("ALSA", "JACK", ...)
    pub host: String,
    /// Whether this is its host's default output
    pub is_default: bool,
    /// Common sample rates within the supported ranges
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// List output devices from all hosts, defaults first
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut devices: Vec<AudioDevice> = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_label = host_name(host_id);
        let default_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        let outputs = match host.output_devices() {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate devices for {:?}: {}", host_id, e);
                continue;
            }
        };

        for device in outputs {
            let Ok(name) = device.name() else { continue };
            let configs: Vec<_> = match device.supported_output_configs() {
                Ok(c) => c.collect(),
                Err(_) => continue,
            };
            if configs.is_empty() {
                continue;
            }

            let mut sample_rates: Vec<u32> = Vec::new();
            let mut max_channels: u16 = 0;
            for config in &configs {
                max_channels = max_channels.max(config.channels());
                for rate in [22050, 32000, 44100, 48000, 96000] {
                    if (config.min_sample_rate().0..=config.max_sample_rate().0).contains(&rate)
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            sample_rates.sort_unstable();

            devices.push(AudioDevice {
                id: DeviceId::with_host(&name, &host_label),
                is_default: default_name.as_ref() == Some(&name),
                name,
                host: host_label.clone(),
                sample_rates,
                max_channels,
            });
        }
    }

    if devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });
    log::debug!("Enumerated {} audio output devices", devices.len());
    Ok(devices)
}

/// Find a device by id
///
/// Uses the id's host when given, otherwise searches every host by name.
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<cpal::Device> {
    if let Some(host) = id.host.as_deref().and_then(host_by_name) {
        return host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()));
    }

    for host_id in cpal::available_hosts() {
        let Ok(host) = cpal::host_from_id(host_id) else { continue };
        let Ok(mut outputs) = host.output_devices() else { continue };
        if let Some(device) = outputs.find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name)) {
            return Ok(device);
        }
    }

    Err(AudioError::DeviceNotFound(id.display_label()))
}

/// Default output device of the default host
pub fn default_output_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice("host reports no default output".to_string()))
}

/// Resolve an optional configured device, falling back to the default
pub fn resolve_device(id: Option<&DeviceId>) -> AudioResult<cpal::Device> {
    match id {
        Some(id) => find_device_by_id(id),
        None => default_output_device(),
    }
}
