//! Emulator over a "Game Music Files" container
//!
//! Track N is the single track of embedded file N. The inner emulator for the
//! current track is opened lazily by `start_track`; metadata queries open the
//! embedded file for information only.

use super::{open_data, EmuError, EmuResult, MusicEmu, OpenMode, TrackInfo};
use crate::container::Container;
use crate::types::Sample;

pub struct PackedEmu {
    data: Vec<u8>,
    container: Container,
    mode: OpenMode,
    current: Option<Box<dyn MusicEmu>>,
}

impl PackedEmu {
    pub fn from_bytes(data: Vec<u8>, mode: OpenMode) -> EmuResult<Self> {
        let container = Container::parse(&data)?;
        log::info!("Opened container with {} tracks", container.len());
        Ok(Self {
            data,
            container,
            mode,
            current: None,
        })
    }

    fn open_entry(&self, index: usize, mode: OpenMode) -> EmuResult<Box<dyn MusicEmu>> {
        let range = self
            .container
            .entry(index)
            .ok_or_else(|| EmuError::TrackOutOfRange {
                requested: index as i64,
                track_count: self.container.len(),
                clamped: self.container.len().saturating_sub(1),
            })?;
        let emu = open_data(self.data[range].to_vec(), mode)?;
        if emu.track_count() != 1 {
            return Err(EmuError::InvalidData(format!(
                "container entry {} holds {} tracks, expected 1",
                index,
                emu.track_count()
            )));
        }
        Ok(emu)
    }
}

impl MusicEmu for PackedEmu {
    fn track_count(&self) -> usize {
        self.container.len()
    }

    fn track_info(&self, index: usize) -> EmuResult<TrackInfo> {
        self.open_entry(index, OpenMode::InfoOnly)?.track_info(0)
    }

    fn start_track(&mut self, index: usize) -> EmuResult<()> {
        let mut emu = self.open_entry(index, self.mode)?;
        emu.start_track(0)?;
        self.current = Some(emu);
        Ok(())
    }

    fn play(&mut self, out: &mut [Sample]) -> EmuResult<()> {
        match self.current.as_mut() {
            Some(emu) => emu.play(out),
            None => Err(EmuError::DecodeFailure("no track started".to_string())),
        }
    }

    fn voice_count(&self) -> usize {
        self.current.as_ref().map_or(0, |emu| emu.voice_count())
    }

    fn voice_name(&self, index: usize) -> String {
        self.current
            .as_ref()
            .map(|emu| emu.voice_name(index))
            .unwrap_or_default()
    }

    fn mute_voice(&mut self, index: usize, muted: bool) {
        if let Some(emu) = self.current.as_mut() {
            emu.mute_voice(index, muted);
        }
    }

    fn tell_ms(&self) -> i64 {
        self.current.as_ref().map_or(0, |emu| emu.tell_ms())
    }

    fn sample_rate(&self) -> u32 {
        self.mode.sample_rate().unwrap_or(0)
    }
}
