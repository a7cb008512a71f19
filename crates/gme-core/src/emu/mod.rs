//! Decode collaborator for game music files
//!
//! Everything the playback core needs from a decoder goes through the
//! [`MusicEmu`] trait: track enumeration and metadata, starting a track,
//! producing interleaved 16-bit stereo PCM, and per-voice muting.
//!
//! Supported inputs:
//! - **RIFF/WAVE** ([`WavEmu`]): one track, one voice per channel
//! - **Game Music Files containers** ([`PackedEmu`]): one track per embedded
//!   blob, each blob opened through [`open_data`]
//!
//! # Example Usage
//!
//! ```ignore
//! use gme_core::emu::{open_file, OpenMode};
//!
//! let mut emu = open_file(&path, OpenMode::Playback(44100))?;
//! emu.start_track(0)?;
//! let mut block = vec![0i16; 1024];
//! emu.play(&mut block)?;
//! ```

mod error;
mod packed;
mod wav;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::container;
use crate::types::{Sample, DEFAULT_PLAY_LENGTH_MS};

pub use error::{EmuError, EmuResult};
pub use packed::PackedEmu;
pub use wav::WavEmu;

/// How an emulator is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Full decoding at the given output sample rate
    Playback(u32),
    /// Metadata only; `play` fails with [`EmuError::InfoOnly`]
    InfoOnly,
}

impl OpenMode {
    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            OpenMode::Playback(rate) => Some(*rate),
            OpenMode::InfoOnly => None,
        }
    }
}

/// Per-track metadata
///
/// Absent strings are empty; absent lengths are -1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub system: String,
    pub game: String,
    pub song: String,
    pub author: String,
    pub copyright: String,
    pub comment: String,
    pub dumper: String,
    pub length_ms: i32,
    pub intro_length_ms: i32,
    pub loop_length_ms: i32,
    pub play_length_ms: i32,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            system: String::new(),
            game: String::new(),
            song: String::new(),
            author: String::new(),
            copyright: String::new(),
            comment: String::new(),
            dumper: String::new(),
            length_ms: -1,
            intro_length_ms: -1,
            loop_length_ms: -1,
            play_length_ms: DEFAULT_PLAY_LENGTH_MS,
        }
    }
}

impl TrackInfo {
    /// Set the three reported lengths and derive the play length from them
    pub fn with_lengths(mut self, length_ms: i32, intro_length_ms: i32, loop_length_ms: i32) -> Self {
        self.length_ms = length_ms;
        self.intro_length_ms = intro_length_ms;
        self.loop_length_ms = loop_length_ms;
        self.play_length_ms = play_length(length_ms, intro_length_ms, loop_length_ms);
        self
    }
}

/// Length to play a track for when nothing else is specified
///
/// The track length if known, otherwise the intro plus two loops, otherwise
/// two and a half minutes.
pub fn play_length(length_ms: i32, intro_length_ms: i32, loop_length_ms: i32) -> i32 {
    if length_ms > 0 {
        length_ms
    } else if loop_length_ms > 0 {
        intro_length_ms.max(0) + loop_length_ms * 2
    } else {
        DEFAULT_PLAY_LENGTH_MS
    }
}

/// A game music decoder
pub trait MusicEmu {
    /// Number of tracks in the open media
    fn track_count(&self) -> usize;

    /// Metadata for track `index`
    fn track_info(&self, index: usize) -> EmuResult<TrackInfo>;

    /// Start playing track `index` from the beginning
    fn start_track(&mut self, index: usize) -> EmuResult<()>;

    /// Fill `out` with the next interleaved stereo samples of the current track
    ///
    /// `out.len()` is a whole number of frames. A track that runs out mid-block
    /// is padded with silence; the following call fails with
    /// [`EmuError::EndOfTrack`].
    fn play(&mut self, out: &mut [Sample]) -> EmuResult<()>;

    /// Voices exposed by the current track
    fn voice_count(&self) -> usize;

    /// Display name of voice `index`
    fn voice_name(&self, index: usize) -> String;

    /// Mute or unmute voice `index`; out-of-range indices are ignored
    fn mute_voice(&mut self, index: usize, muted: bool);

    /// Milliseconds played since the current track started
    fn tell_ms(&self) -> i64;

    /// Output sample rate, or 0 when opened for information only
    fn sample_rate(&self) -> u32;
}

/// Known media formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Wav,
    Packed,
}

/// Identify the format of `data` from its leading bytes
pub fn detect_format(data: &[u8]) -> Option<Format> {
    if container::is_container(data) {
        Some(Format::Packed)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        Some(Format::Wav)
    } else {
        None
    }
}

/// Open in-memory media
pub fn open_data(data: Vec<u8>, mode: OpenMode) -> EmuResult<Box<dyn MusicEmu>> {
    match detect_format(&data) {
        Some(Format::Wav) => Ok(Box::new(WavEmu::from_bytes(&data, mode)?)),
        Some(Format::Packed) => Ok(Box::new(PackedEmu::from_bytes(data, mode)?)),
        None => Err(EmuError::UnsupportedFormat(
            "unrecognized file signature".to_string(),
        )),
    }
}

/// Open a media file from disk
pub fn open_file(path: &Path, mode: OpenMode) -> EmuResult<Box<dyn MusicEmu>> {
    log::info!("Opening {:?} ({:?})", path, mode);
    let data = std::fs::read(path).map_err(|source| EmuError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    open_data(data, mode)
}

/// Validate a requested track number against `track_count`
///
/// Out-of-range requests yield [`EmuError::TrackOutOfRange`] carrying the
/// nearest valid track, which callers use after warning.
pub fn select_track(requested: i64, track_count: usize) -> EmuResult<usize> {
    if track_count == 0 {
        return Err(EmuError::InvalidData("media contains no tracks".to_string()));
    }
    if requested >= 0 && (requested as u64) < track_count as u64 {
        return Ok(requested as usize);
    }
    let clamped = if requested < 0 { 0 } else { track_count - 1 };
    Err(EmuError::TrackOutOfRange {
        requested,
        track_count,
        clamped,
    })
}
