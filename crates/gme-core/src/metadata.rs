//! Metadata dump
//!
//! JSON description of every track in a media file:
//!
//! ```text
//! {
//!   "track_count": 2,
//!   "tracks": [ { "system": ..., "game": ..., ..., "dumper": ... }, ... ],
//!   "system": ..., "game": ..., ...        <- strings of track 0 again
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::emu::{EmuResult, MusicEmu, TrackInfo};

/// The descriptive strings of one track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaStrings {
    pub system: String,
    pub game: String,
    pub song: String,
    pub author: String,
    pub copyright: String,
    pub comment: String,
    pub dumper: String,
}

impl From<&TrackInfo> for MetaStrings {
    fn from(info: &TrackInfo) -> Self {
        Self {
            system: info.system.clone(),
            game: info.game.clone(),
            song: info.song.clone(),
            author: info.author.clone(),
            copyright: info.copyright.clone(),
            comment: info.comment.clone(),
            dumper: info.dumper.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDump {
    pub track_count: usize,
    pub tracks: Vec<MetaStrings>,
    /// First track's strings, repeated at the top level
    #[serde(flatten)]
    pub first: MetaStrings,
}

impl MetadataDump {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Collect the strings of every track
///
/// Any failing track fails the whole dump.
pub fn dump(emu: &dyn MusicEmu) -> EmuResult<MetadataDump> {
    let track_count = emu.track_count();
    let tracks = (0..track_count)
        .map(|i| emu.track_info(i).map(|info| MetaStrings::from(&info)))
        .collect::<EmuResult<Vec<_>>>()?;
    let first = match tracks.first() {
        Some(strings) => strings.clone(),
        None => MetaStrings::from(&emu.track_info(0)?),
    };
    log::debug!("Collected metadata for {} tracks", track_count);
    Ok(MetadataDump {
        track_count,
        tracks,
        first,
    })
}
