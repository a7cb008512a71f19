//! Settings file support shared by the front ends
//!
//! ```ignore
//! use gme_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path("config.yaml");
//! let settings: PlayerConfig = load_config(&path);
//! save_config(&settings, &path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{config_dir, default_config_path, APP_DIR};
