//! Player configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/gmeplay/config.yaml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gme_core::audio::{AudioConfig, BufferSize, DeviceId};
use gme_core::types::{
    whole_frames, CHANNELS, DEFAULT_PERIOD_SAMPLES, DEFAULT_RING_PERIODS, SAMPLE_RATE,
};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub audio: AudioSettings,
    pub display: DisplaySettings,
    /// Sleep between playback loop iterations
    pub tick_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            display: DisplaySettings::default(),
            tick_ms: 2,
        }
    }
}

impl PlayerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Audio section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Requested output rate; the device may pick another
    pub sample_rate: u32,
    /// Interleaved samples per host callback
    pub period_samples: usize,
    /// Ring capacity in periods
    pub ring_periods: usize,
    /// Refill threshold; half a callback period when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_water_samples: Option<usize>,
    /// Output device; system default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceId>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            period_samples: DEFAULT_PERIOD_SAMPLES,
            ring_periods: DEFAULT_RING_PERIODS,
            low_water_samples: None,
            device: None,
        }
    }
}

impl AudioSettings {
    fn period(&self) -> usize {
        whole_frames(self.period_samples).max(CHANNELS)
    }

    /// Samples per callback: the configured period, or more if the device
    /// negotiated a longer one
    pub fn callback_period(&self, device_frames: u32) -> usize {
        self.period().max(device_frames as usize * CHANNELS)
    }

    /// Ring size in interleaved samples (at least two callback periods)
    pub fn ring_capacity(&self, device_frames: u32) -> usize {
        self.callback_period(device_frames) * self.ring_periods.max(2)
    }

    /// Refill threshold; half a callback period unless configured
    pub fn low_water(&self, device_frames: u32) -> usize {
        let capacity = self.ring_capacity(device_frames);
        self.low_water_samples
            .map(whole_frames)
            .unwrap_or_else(|| whole_frames(self.callback_period(device_frames) / 2))
            .min(capacity)
    }

    /// Host stream settings derived from this section
    pub fn output_config(&self) -> AudioConfig {
        AudioConfig {
            device: self.device.clone(),
            sample_rate: self.sample_rate,
            buffer_size: BufferSize::Fixed((self.period() / CHANNELS) as u32),
        }
    }
}

/// Waveform display section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub enabled: bool,
    /// Frames per second of the waveform view
    pub frame_rate: u32,
    /// Waveform size in terminal cells; each cell holds two pixel rows
    pub width: usize,
    pub height: usize,
    /// Interleaved samples drawn per frame
    pub window_samples: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_rate: 30,
            width: 64,
            height: 16,
            window_samples: DEFAULT_PERIOD_SAMPLES,
        }
    }
}

/// ~/.config/gmeplay/config.yaml
pub fn default_config_path() -> PathBuf {
    gme_core::config::default_config_path("config.yaml")
}

/// Where logs go while the terminal is in raw mode
pub fn default_log_path() -> PathBuf {
    gme_core::config::default_config_path("gmeplay.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gme_core::config::{load_config, save_config};

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.ring_capacity(512), 10 * 1024);
        assert_eq!(config.audio.low_water(512), 512);
        assert_eq!(config.display.frame_rate, 30);
        assert_eq!(config.tick(), Duration::from_millis(2));
    }

    #[test]
    fn test_output_config_uses_frames() {
        let audio = AudioSettings::default();
        let output = audio.output_config();
        assert_eq!(output.buffer_size, BufferSize::Fixed(512));
        assert_eq!(output.sample_rate, 44100);
        assert!(output.device.is_none());
    }

    #[test]
    fn test_odd_sizes_are_normalized() {
        let audio = AudioSettings {
            period_samples: 1023,
            ring_periods: 1,
            low_water_samples: Some(999_999),
            ..AudioSettings::default()
        };
        assert_eq!(audio.ring_capacity(0), 2044);
        assert_eq!(audio.low_water(0), 2044);

        let audio = AudioSettings {
            low_water_samples: Some(301),
            ..AudioSettings::default()
        };
        assert_eq!(audio.low_water(512), 300);
    }

    #[test]
    fn test_ring_follows_negotiated_period() {
        let audio = AudioSettings::default();
        // Device forced a 2048-frame period on a 512-frame request
        assert_eq!(audio.callback_period(2048), 4096);
        assert_eq!(audio.ring_capacity(2048), 10 * 4096);
        assert_eq!(audio.low_water(2048), 2048);
        // A shorter device period keeps the configured one
        assert_eq!(audio.ring_capacity(256), 10 * 1024);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "audio:\n  ring_periods: 4\ndisplay:\n  enabled: false\n";
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.audio.ring_periods, 4);
        assert_eq!(config.audio.period_samples, 1024);
        assert!(!config.display.enabled);
        assert_eq!(config.tick_ms, 2);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = PlayerConfig::default();
        config.audio.device = Some(DeviceId::with_host("hw:1,0", "ALSA"));
        config.audio.low_water_samples = Some(2048);
        config.display.width = 100;

        save_config(&config, &path).unwrap();
        let loaded: PlayerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_paths_live_in_app_dir() {
        let config = default_config_path();
        let log = default_log_path();
        assert_eq!(config.file_name().unwrap(), "config.yaml");
        assert_eq!(config.parent(), log.parent());
        assert!(config.parent().unwrap().to_string_lossy().contains("gmeplay"));
    }
}
