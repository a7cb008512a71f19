//! Test doubles for the decode collaborator

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use super::{EmuError, EmuResult, MusicEmu, TrackInfo};
use crate::types::Sample;

/// What a [`ScriptedEmu`] was asked to do
#[derive(Debug, Default)]
pub struct EmuProbe {
    pub started: Vec<usize>,
    pub mutes: Vec<(usize, bool)>,
    pub play_calls: usize,
}

/// Emulator with a fixed script: voice counts per track and an optional
/// failing `play` call
///
/// Every produced sample carries the 1-based number of the `play` call that
/// produced it, so tests can tell blocks apart.
pub struct ScriptedEmu {
    voices_per_track: Vec<usize>,
    current: usize,
    fail_on_call: Option<usize>,
    produced_frames: u64,
    sample_rate: u32,
    muted: Vec<bool>,
    probe: Arc<Mutex<EmuProbe>>,
}

impl ScriptedEmu {
    pub fn new(voices_per_track: Vec<usize>) -> (Self, Arc<Mutex<EmuProbe>>) {
        let probe = Arc::new(Mutex::new(EmuProbe::default()));
        let emu = Self {
            voices_per_track,
            current: 0,
            fail_on_call: None,
            produced_frames: 0,
            sample_rate: 1000,
            muted: Vec::new(),
            probe: probe.clone(),
        };
        (emu, probe)
    }

    /// Make the `call`-th `play` (1-based) and every later one fail
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl MusicEmu for ScriptedEmu {
    fn track_count(&self) -> usize {
        self.voices_per_track.len()
    }

    fn track_info(&self, index: usize) -> EmuResult<TrackInfo> {
        if index >= self.voices_per_track.len() {
            return Err(EmuError::DecodeFailure(format!("no track {}", index)));
        }
        Ok(TrackInfo {
            system: "Scripted".to_string(),
            game: "Test Game".to_string(),
            song: format!("Song {}", index + 1),
            ..TrackInfo::default()
        }
        .with_lengths(60_000, -1, -1))
    }

    fn start_track(&mut self, index: usize) -> EmuResult<()> {
        self.track_info(index)?;
        self.current = index;
        self.produced_frames = 0;
        self.muted = vec![false; self.voices_per_track[index]];
        self.probe.lock().unwrap().started.push(index);
        Ok(())
    }

    fn play(&mut self, out: &mut [Sample]) -> EmuResult<()> {
        let call = {
            let mut probe = self.probe.lock().unwrap();
            probe.play_calls += 1;
            probe.play_calls
        };
        if self.fail_on_call.is_some_and(|n| call >= n) {
            return Err(EmuError::DecodeFailure("scripted failure".to_string()));
        }
        out.fill(call as Sample);
        self.produced_frames += (out.len() / 2) as u64;
        Ok(())
    }

    fn voice_count(&self) -> usize {
        self.voices_per_track.get(self.current).copied().unwrap_or(0)
    }

    fn voice_name(&self, index: usize) -> String {
        format!("Voice {}", index + 1)
    }

    fn mute_voice(&mut self, index: usize, muted: bool) {
        if let Some(flag) = self.muted.get_mut(index) {
            *flag = muted;
            self.probe.lock().unwrap().mutes.push((index, muted));
        }
    }

    fn tell_ms(&self) -> i64 {
        (self.produced_frames * 1000 / self.sample_rate as u64) as i64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Encode interleaved 16-bit samples as an in-memory WAV file
pub fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut data = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut data), spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    data
}
