//! YAML settings files
//!
//! Loading never fails: a missing file means defaults, an unreadable or
//! malformed one is reported and replaced by defaults so playback can still
//! start. Saving reports every failure.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read `path` as YAML, or fall back to `T::default()`
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match try_load_config(path) {
        Ok(Some(config)) => {
            log::info!("Loaded settings from {:?}", path);
            config
        }
        Ok(None) => {
            log::debug!("No settings file at {:?}, using defaults", path);
            T::default()
        }
        Err(e) => {
            log::warn!("Ignoring settings file: {:#}", e);
            T::default()
        }
    }
}

/// Read `path` as YAML; `Ok(None)` when the file does not exist
pub fn try_load_config<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(config))
}

/// Write `config` to `path` as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize settings")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Saved settings to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Settings {
        rate: u32,
        device: Option<String>,
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert_eq!(load_config::<Settings>(&path), Settings::default());
        assert!(try_load_config::<Settings>(&path).unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "rate: [not a number").unwrap();
        assert!(try_load_config::<Settings>(&path).is_err());
        assert_eq!(load_config::<Settings>(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "rate: 48000\n").unwrap();
        let loaded: Settings = load_config(&path);
        assert_eq!(loaded.rate, 48000);
        assert_eq!(loaded.device, None);
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("settings.yaml");
        let settings = Settings {
            rate: 22050,
            device: Some("hw:1".to_string()),
        };
        save_config(&settings, &path).unwrap();
        assert_eq!(load_config::<Settings>(&path), settings);
    }
}
