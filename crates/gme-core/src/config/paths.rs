//! Standard locations for player settings

use std::path::PathBuf;

/// Directory name under the platform config directory
pub const APP_DIR: &str = "gmeplay";

/// `~/.config/gmeplay` on Linux, the platform equivalent elsewhere
///
/// Falls back to `./.gmeplay` when the platform reports no config directory.
pub fn config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => PathBuf::from(".").join(format!(".{}", APP_DIR)),
    }
}

/// Path of a settings file inside [`config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    config_dir().join(filename)
}
