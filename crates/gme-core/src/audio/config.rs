//! Audio host configuration
//!
//! Device selection, sample rate and the per-callback period size requested
//! from the host.

use serde::{Deserialize, Serialize};

use crate::types::{CHANNELS, DEFAULT_PERIOD_SAMPLES, SAMPLE_RATE};

/// Largest period (in stereo frames) the callback sink pre-allocates for
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default period in stereo frames
pub const DEFAULT_BUFFER_SIZE: u32 = (DEFAULT_PERIOD_SAMPLES / CHANNELS) as u32;

/// Preferred period size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the host choose
    #[default]
    Default,
    /// Request a specific period in frames (clamped to 64..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Frames to request from the host, or None for the host default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(64, MAX_BUFFER_SIZE as u32)),
        }
    }

    /// Period length in milliseconds at `sample_rate`
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        let frames = self.as_frames().unwrap_or(DEFAULT_BUFFER_SIZE);
        (frames as f32 / sample_rate as f32) * 1000.0
    }
}

/// Audio device identifier
///
/// Device name plus the host backend it belongs to (ALSA, PulseAudio, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    /// Host identifier; None searches every available host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// "[host] name", or just the name
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
    /// Requested sample rate; the device may force another one
    pub sample_rate: u32,
    /// Requested period size
    pub buffer_size: BufferSize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: SAMPLE_RATE,
            buffer_size: BufferSize::Fixed(DEFAULT_BUFFER_SIZE),
        }
    }
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_period_matches_sample_constant() {
        let config = AudioConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.buffer_size.as_frames(), Some(512));
    }

    #[test]
    fn test_fixed_buffer_is_clamped() {
        assert_eq!(BufferSize::Fixed(8).as_frames(), Some(64));
        assert_eq!(BufferSize::Fixed(1 << 20).as_frames(), Some(MAX_BUFFER_SIZE as u32));
        assert_eq!(BufferSize::Default.as_frames(), None);
    }

    #[test]
    fn test_latency() {
        let latency = BufferSize::Fixed(441).latency_ms(44100);
        assert!((latency - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("default").display_label(), "default");
        assert_eq!(
            DeviceId::with_host("hw:0,0", "ALSA").display_label(),
            "[ALSA] hw:0,0"
        );
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = AudioConfig::default()
            .with_device(DeviceId::with_host("pulse", "ALSA"))
            .with_sample_rate(48000)
            .with_buffer_frames(256);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AudioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
