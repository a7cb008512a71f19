//! Audio host integration
//!
//! The realtime half of playback: device lookup, the cpal stream and the
//! [`AudioCallbackSink`] that drains the shared ring inside the host callback.
//!
//! ```ignore
//! use gme_core::audio::{plan_output, AudioCallbackSink, AudioConfig, AudioOutput};
//!
//! let plan = plan_output(&AudioConfig::default())?;
//! let ring = SharedRingBuffer::new(10 * plan.buffer_size() as usize * CHANNELS);
//! let mut output = plan.open(AudioCallbackSink::new(ring.clone()))?;
//! // fill the ring once, then
//! output.start()?;
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod sink;

pub use backend::AudioOutput;
pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use cpal_backend::{plan_output, CpalOutput, OutputPlan};
pub use device::{
    default_output_device, find_device_by_id, get_output_devices, resolve_device, AudioDevice,
};
pub use error::{AudioError, AudioResult};
pub use sink::AudioCallbackSink;
