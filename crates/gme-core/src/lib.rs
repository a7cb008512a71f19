//! gme-core - realtime game music playback
//!
//! A decode loop keeps a shared ring buffer topped up while the host audio
//! callback drains it on its own schedule; input handling and a waveform view
//! ride along on the same loop.

pub mod audio;
pub mod blocking;
pub mod config;
pub mod container;
pub mod emu;
pub mod input;
pub mod metadata;
pub mod ring;
pub mod scheduler;
pub mod session;
pub mod types;
pub mod visual;

pub use types::*;
