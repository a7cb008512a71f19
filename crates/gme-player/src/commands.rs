//! Non-interactive subcommands

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use gme_core::audio::get_output_devices;
use gme_core::blocking::{render_track, BlockingSink, RawPcmSink, RenderStop, WavFileSink};
use gme_core::config::save_config;
use gme_core::container::pack_files;
use gme_core::emu::{open_file, select_track, EmuError, OpenMode};
use gme_core::metadata;
use gme_core::session::DecodeSession;

use crate::config::PlayerConfig;

/// Print the metadata of every track as JSON; any failure exits with 2
pub fn info(file: &Path) -> u8 {
    let json = open_file(file, OpenMode::InfoOnly)
        .and_then(|emu| metadata::dump(emu.as_ref()))
        .map_err(|e| e.to_string())
        .and_then(|dump| dump.to_json().map_err(|e| e.to_string()));
    match json {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            2
        }
    }
}

/// How rendered audio is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Stdout,
    RawFile(PathBuf),
    WavFile(PathBuf),
}

impl RenderTarget {
    /// `-` is stdout, `.raw`/`.pcm` are headerless s16le, anything else is WAV
    pub fn from_arg(output: &Path) -> Self {
        if output.as_os_str() == "-" {
            return RenderTarget::Stdout;
        }
        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("raw") | Some("pcm") => RenderTarget::RawFile(output.to_path_buf()),
            _ => RenderTarget::WavFile(output.to_path_buf()),
        }
    }

    fn open(&self, sample_rate: u32) -> Result<Box<dyn BlockingSink>> {
        Ok(match self {
            RenderTarget::Stdout => Box::new(RawPcmSink::new(io::stdout().lock())),
            RenderTarget::RawFile(path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {:?}", path))?;
                Box::new(RawPcmSink::new(io::BufWriter::new(file)))
            }
            RenderTarget::WavFile(path) => Box::new(
                WavFileSink::create(path, sample_rate)
                    .with_context(|| format!("Failed to create {:?}", path))?,
            ),
        })
    }
}

/// Blocking playback of one track into a file or stdout
pub fn render(file: &Path, track: i64, output: &Path, config: &PlayerConfig) -> Result<u8> {
    let sample_rate = config.audio.sample_rate;
    let emu = open_file(file, OpenMode::Playback(sample_rate))
        .with_context(|| format!("Failed to open {:?}", file))?;
    let track = match select_track(track, emu.track_count()) {
        Ok(track) => track,
        Err(EmuError::TrackOutOfRange { requested, clamped, .. }) => {
            log::warn!("there is no track {}; playing track {} instead", requested, clamped);
            clamped
        }
        Err(e) => return Err(e.into()),
    };
    let mut session = DecodeSession::new(emu, track)?;

    let target = RenderTarget::from_arg(output);
    let mut sink = target.open(sample_rate)?;
    let summary = render_track(&mut session, sink.as_mut(), config.audio.period_samples)?;

    Ok(match summary.stop {
        RenderStop::PlayLength | RenderStop::DecodeFailure(EmuError::EndOfTrack) => 0,
        RenderStop::DecodeFailure(e) => {
            eprintln!("{}", e);
            1
        }
    })
}

pub fn pack(output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let packed = pack_files(output, inputs)
        .with_context(|| format!("Failed to build {:?}", output))?;
    for (i, path) in packed.iter().enumerate() {
        println!("track {}: {}", i, path.display());
    }
    Ok(())
}

pub fn devices() -> Result<()> {
    let devices = get_output_devices().context("Failed to enumerate audio devices")?;
    for device in devices {
        println!("{}", device);
    }
    Ok(())
}

/// Show the effective settings, optionally writing them back to `path`
pub fn show_config(path: &Path, config: &PlayerConfig, write: bool) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize settings")?);
    if write {
        save_config(config, path)?;
        println!("# saved");
    }
    Ok(())
}
