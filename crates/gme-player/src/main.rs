//! gmeplay - terminal game music player
//!
//! `gmeplay play FILE [TRACK]` plays a track in real time. Digit keys toggle
//! voices 0-9, Left/Right change track, Escape quits. The other subcommands
//! dump metadata, render to WAV or raw PCM, build multi-track containers and
//! list audio devices.
//!
//! Set RUST_LOG=debug for verbose output. While playing, logs go to
//! ~/.config/gmeplay/gmeplay.log so they do not garble the screen.

mod commands;
mod config;
mod play;
mod terminal;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use gme_core::audio::DeviceId;
use gme_core::config::load_config;

use config::PlayerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "gmeplay",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    /// Settings file (default: ~/.config/gmeplay/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output sample rate in Hz
    #[arg(long, global = true, value_name = "HZ")]
    sample_rate: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a track through the audio device
    Play {
        file: PathBuf,
        /// Track number, starting at 0
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        track: i64,
        /// Output device name (see `gmeplay devices`)
        #[arg(long, value_name = "NAME")]
        device: Option<String>,
        /// Print messages only, no waveform
        #[arg(long)]
        no_visual: bool,
    },
    /// Print track metadata as JSON
    Info { file: PathBuf },
    /// Render a track to a WAV file, raw PCM file, or stdout (`-`)
    Render {
        file: PathBuf,
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        track: i64,
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Pack several files into one multi-track container
    Pack {
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// List audio output devices
    Devices,
    /// Show the effective settings
    Config {
        /// Save them to the settings file
        #[arg(long)]
        write: bool,
    },
}

/// Log to stderr, or to `log_file` when the terminal belongs to the player
fn init_logging(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot write log file {:?}: {}", path, e);
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}

fn load_settings(cli: &Cli) -> (PathBuf, PlayerConfig) {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings: PlayerConfig = load_config(&path);
    if let Some(rate) = cli.sample_rate {
        settings.audio.sample_rate = rate;
    }
    (path, settings)
}

fn run(cli: Cli) -> Result<u8> {
    let (config_path, mut settings) = load_settings(&cli);

    match cli.command {
        Commands::Play {
            file,
            track,
            device,
            no_visual,
        } => {
            if let Some(name) = device {
                settings.audio.device = Some(DeviceId::new(name));
            }
            if no_visual {
                settings.display.enabled = false;
            }
            play::run(&file, track, &settings)
        }
        Commands::Info { file } => Ok(commands::info(&file)),
        Commands::Render {
            file,
            track,
            output,
        } => commands::render(&file, track, &output, &settings),
        Commands::Pack { output, inputs } => commands::pack(&output, &inputs).map(|_| 0),
        Commands::Devices => commands::devices().map(|_| 0),
        Commands::Config { write } => commands::show_config(&config_path, &settings, write).map(|_| 0),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_file = matches!(cli.command, Commands::Play { .. }).then(config::default_log_path);
    init_logging(log_file.as_deref());
    log::info!("gmeplay {} starting", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
