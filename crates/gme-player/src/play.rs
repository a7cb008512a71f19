//! `gmeplay play`: realtime playback with voice toggles and a waveform

use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use gme_core::audio::{plan_output, AudioCallbackSink, AudioOutput};
use gme_core::emu::{open_file, select_track, EmuError, OpenMode};
use gme_core::ring::SharedRingBuffer;
use gme_core::scheduler::{FinishReason, FrameRenderer, PlaybackConfig, PlaybackScheduler};
use gme_core::session::DecodeSession;
use gme_core::visual::VisualizationSampler;

use crate::config::PlayerConfig;
use crate::terminal::{LineRenderer, TerminalGuard, TerminalInput, TerminalRenderer};

/// Lines printed before playback starts
pub fn describe(session: &DecodeSession) -> Vec<String> {
    let info = session.track_info();
    let mut lines = vec![
        format!("system: {}", info.system),
        format!("game: {}", info.game),
        format!("song: {}", info.song),
        format!("length: {} ms", info.length_ms),
        format!("play length: {} ms", info.play_length_ms),
        format!("playing track {}", session.track_index()),
    ];
    lines.extend((0..session.voice_count()).map(|i| format!("voice {}: {}", i, session.voice_name(i))));
    lines
}

/// Requested track, or the nearest one with a warning
fn pick_track(requested: i64, track_count: usize) -> Result<usize, EmuError> {
    match select_track(requested, track_count) {
        Ok(track) => Ok(track),
        Err(EmuError::TrackOutOfRange { clamped, .. }) => {
            let text = format!("there is no track {}; playing track {} instead", requested, clamped);
            log::warn!("{}", text);
            println!("{}", text);
            Ok(clamped)
        }
        Err(e) => Err(e),
    }
}

/// Exit status for a finished playback
pub fn exit_status(reason: &FinishReason) -> u8 {
    match reason {
        FinishReason::Quit | FinishReason::DecodeFailure(EmuError::EndOfTrack) => 0,
        FinishReason::DecodeFailure(_) => 1,
    }
}

pub fn run(file: &Path, track: i64, config: &PlayerConfig) -> Result<u8> {
    // Validate the media before touching the audio host
    let probe = match open_file(file, OpenMode::InfoOnly) {
        Ok(emu) => emu,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(1);
        }
    };
    let track = match pick_track(track, probe.track_count()) {
        Ok(track) => track,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(1);
        }
    };
    drop(probe);

    let audio = &config.audio;
    let plan = plan_output(&audio.output_config()).context("Failed to open audio output")?;
    let device_frames = plan.buffer_size();
    let ring = SharedRingBuffer::new(audio.ring_capacity(device_frames));
    let sink = AudioCallbackSink::new(ring.clone());
    let underruns = sink.underrun_counter();
    let output = plan.open(sink).context("Failed to open audio output")?;
    log::info!(
        "Audio output ready: {} Hz, {} frames per period ({:.1} ms)",
        output.sample_rate(),
        output.buffer_size(),
        output.latency_ms()
    );

    let emu = open_file(file, OpenMode::Playback(output.sample_rate()))
        .with_context(|| format!("Failed to open {:?}", file))?;
    let session = match DecodeSession::new(emu, track) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(2);
        }
    };

    let header = describe(&session);
    for line in &header {
        println!("{}", line);
    }

    let playback = PlaybackConfig {
        low_water_samples: audio.low_water(device_frames),
        tick: config.tick(),
    };
    let mut scheduler =
        PlaybackScheduler::new(session, ring, output, playback).with_underrun_counter(underruns);
    let display = &config.display;
    if display.enabled {
        scheduler = scheduler.with_visualization(VisualizationSampler::new(
            display.frame_rate,
            display.width,
            display.height * 2,
            display.window_samples,
        ));
    }

    let reason = {
        let guard = TerminalGuard::enter(display.enabled).context("Failed to set up the terminal")?;
        let mut input = TerminalInput::new(guard.reports_releases());
        let mut renderer: Box<dyn FrameRenderer> = if display.enabled {
            Box::new(TerminalRenderer::new(header, display.height * 2))
        } else {
            Box::new(LineRenderer::new(io::stdout()))
        };
        scheduler.run(&mut input, renderer.as_mut())?
    };

    match &reason {
        FinishReason::Quit => log::info!("Stopped by user"),
        FinishReason::DecodeFailure(EmuError::EndOfTrack) => log::info!("Track finished"),
        FinishReason::DecodeFailure(e) => log::error!("Playback stopped: {}", e),
    }
    if let Some(text) = lost_report(&reason, display.enabled) {
        eprintln!("{}", text);
    }
    Ok(exit_status(&reason))
}

/// The failure message, if leaving the alternate screen erased it
///
/// The scheduler already showed it through the renderer; line output keeps
/// it on the terminal.
fn lost_report(reason: &FinishReason, alternate_screen: bool) -> Option<String> {
    match reason {
        FinishReason::DecodeFailure(e) if alternate_screen && !matches!(e, EmuError::EndOfTrack) => {
            Some(e.to_string())
        }
        _ => None,
    }
}
