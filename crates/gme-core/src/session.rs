//! Decode session: the producer-side owner of the emulator
//!
//! Holds the current track, the per-voice mute flags and the elapsed time of
//! the current track. Nothing here is shared with the audio callback.

use crate::emu::{EmuError, EmuResult, MusicEmu, TrackInfo};
use crate::types::{samples_to_ms, Sample, MAX_VOICES};

/// Direction of a track seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStep {
    Previous,
    Next,
}

pub struct DecodeSession {
    emu: Box<dyn MusicEmu>,
    track_index: usize,
    track_count: usize,
    /// Mute flags by voice index; they outlive track changes
    muted: [bool; MAX_VOICES],
    /// Interleaved samples produced since the current track started
    produced: u64,
    info: TrackInfo,
}

impl DecodeSession {
    /// Start `track` on `emu`
    ///
    /// `track` must already be validated (see [`crate::emu::select_track`]).
    pub fn new(mut emu: Box<dyn MusicEmu>, track: usize) -> EmuResult<Self> {
        let track_count = emu.track_count();
        if track >= track_count {
            return Err(EmuError::TrackOutOfRange {
                requested: track as i64,
                track_count,
                clamped: track_count.saturating_sub(1),
            });
        }
        let info = emu.track_info(track)?;
        emu.start_track(track)?;
        log::info!("Started track {} of {}", track, track_count);
        Ok(Self {
            emu,
            track_index: track,
            track_count,
            muted: [false; MAX_VOICES],
            produced: 0,
            info,
        })
    }

    /// Decode the next `out.len()` interleaved samples of the current track
    ///
    /// Mute flags already applied through [`toggle_voice`](Self::toggle_voice)
    /// take effect in this block.
    pub fn produce(&mut self, out: &mut [Sample]) -> EmuResult<()> {
        self.emu.play(out)?;
        self.produced += out.len() as u64;
        Ok(())
    }

    /// Move one track back or forward, wrapping at both ends
    ///
    /// Returns `Ok(false)` without touching anything when the media has a
    /// single track.
    pub fn seek_track(&mut self, step: TrackStep) -> EmuResult<bool> {
        if self.track_count <= 1 {
            return Ok(false);
        }
        let next = match step {
            TrackStep::Next => (self.track_index + 1) % self.track_count,
            TrackStep::Previous => (self.track_index + self.track_count - 1) % self.track_count,
        };

        let info = self.emu.track_info(next)?;
        self.emu.start_track(next)?;
        self.track_index = next;
        self.info = info;
        self.produced = 0;
        self.reapply_mutes();
        log::info!("Seeked to track {} of {}", next, self.track_count);
        Ok(true)
    }

    /// Flip the mute flag of `voice` and hand it to the emulator
    ///
    /// Returns the new state, or `None` (no change) when the current track has
    /// no such voice.
    pub fn toggle_voice(&mut self, voice: usize) -> Option<bool> {
        if voice >= self.addressable_voices() {
            return None;
        }
        self.muted[voice] = !self.muted[voice];
        self.emu.mute_voice(voice, self.muted[voice]);
        Some(self.muted[voice])
    }

    /// Push the persisted flags to a freshly started track
    ///
    /// Flags beyond the new track's voice count are kept but stay inert.
    fn reapply_mutes(&mut self) {
        for voice in 0..self.addressable_voices() {
            if self.muted[voice] {
                self.emu.mute_voice(voice, true);
            }
        }
    }

    fn addressable_voices(&self) -> usize {
        self.emu.voice_count().min(MAX_VOICES)
    }

    pub fn is_muted(&self, voice: usize) -> bool {
        self.muted.get(voice).copied().unwrap_or(false)
    }

    pub fn track_index(&self) -> usize {
        self.track_index
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    pub fn track_info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn voice_count(&self) -> usize {
        self.emu.voice_count()
    }

    pub fn voice_name(&self, voice: usize) -> String {
        self.emu.voice_name(voice)
    }

    pub fn sample_rate(&self) -> u32 {
        self.emu.sample_rate()
    }

    /// Milliseconds of audio produced for the current track
    pub fn elapsed_ms(&self) -> u64 {
        samples_to_ms(self.produced, self.emu.sample_rate())
    }

    /// Whether the track has played for its full play length
    pub fn reached_play_length(&self) -> bool {
        self.elapsed_ms() >= self.info.play_length_ms.max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::testing::{EmuProbe, ScriptedEmu};
    use std::sync::{Arc, Mutex};

    fn session(voices: Vec<usize>) -> (DecodeSession, Arc<Mutex<EmuProbe>>) {
        let (emu, probe) = ScriptedEmu::new(voices);
        (DecodeSession::new(Box::new(emu), 0).unwrap(), probe)
    }

    #[test]
    fn test_new_rejects_bad_track() {
        let (emu, _) = ScriptedEmu::new(vec![2, 2]);
        assert!(matches!(
            DecodeSession::new(Box::new(emu), 2),
            Err(EmuError::TrackOutOfRange { clamped: 1, .. })
        ));
    }

    #[test]
    fn test_seek_wraps_both_directions() {
        let (mut s, _) = session(vec![1, 1, 1]);
        assert!(s.seek_track(TrackStep::Previous).unwrap());
        assert_eq!(s.track_index(), 2);
        assert!(s.seek_track(TrackStep::Next).unwrap());
        assert_eq!(s.track_index(), 0);
        s.seek_track(TrackStep::Next).unwrap();
        assert_eq!(s.track_index(), 1);
    }

    #[test]
    fn test_seek_single_track_is_noop() {
        let (mut s, probe) = session(vec![4]);
        assert!(!s.seek_track(TrackStep::Next).unwrap());
        assert!(!s.seek_track(TrackStep::Previous).unwrap());
        assert_eq!(s.track_index(), 0);
        assert_eq!(probe.lock().unwrap().started, vec![0]);
    }

    #[test]
    fn test_seek_resets_elapsed() {
        let (mut s, _) = session(vec![1, 1]);
        let mut block = vec![0; 2000];
        s.produce(&mut block).unwrap();
        assert_eq!(s.elapsed_ms(), 1000);
        s.seek_track(TrackStep::Next).unwrap();
        assert_eq!(s.elapsed_ms(), 0);
        assert_eq!(s.track_info().song, "Song 2");
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let (mut s, probe) = session(vec![3]);
        assert_eq!(s.toggle_voice(1), Some(true));
        assert!(s.is_muted(1));
        assert_eq!(s.toggle_voice(1), Some(false));
        assert!(!s.is_muted(1));
        assert_eq!(probe.lock().unwrap().mutes, vec![(1, true), (1, false)]);
    }

    #[test]
    fn test_toggle_out_of_range_is_noop() {
        let (mut s, probe) = session(vec![3]);
        assert_eq!(s.toggle_voice(3), None);
        assert_eq!(s.toggle_voice(MAX_VOICES + 4), None);
        assert!(!s.is_muted(3));
        assert!(probe.lock().unwrap().mutes.is_empty());
    }

    #[test]
    fn test_mutes_persist_across_tracks() {
        // Track 1 has fewer voices: voice 2 is remembered but inert there
        let (mut s, probe) = session(vec![4, 2, 4]);
        s.toggle_voice(0);
        s.toggle_voice(2);

        s.seek_track(TrackStep::Next).unwrap();
        assert!(s.is_muted(2));
        assert_eq!(s.toggle_voice(2), None);
        {
            let probe = probe.lock().unwrap();
            assert_eq!(&probe.mutes[2..], &[(0, true)]);
        }

        s.seek_track(TrackStep::Next).unwrap();
        let probe = probe.lock().unwrap();
        assert_eq!(&probe.mutes[3..], &[(0, true), (2, true)]);
    }

    #[test]
    fn test_produce_failure_propagates() {
        let (emu, _) = ScriptedEmu::new(vec![1]);
        let mut s = DecodeSession::new(Box::new(emu.failing_on(2)), 0).unwrap();
        let mut block = vec![0; 8];
        s.produce(&mut block).unwrap();
        assert!(s.produce(&mut block).unwrap_err().is_decode_failure());
    }

    #[test]
    fn test_reached_play_length() {
        let (mut s, _) = session(vec![1]);
        assert!(!s.reached_play_length());
        // Scripted tracks are 60 s long at 1000 Hz stereo
        let mut block = vec![0; 120_000];
        s.produce(&mut block).unwrap();
        assert!(s.reached_play_length());
    }
}
