//! Playback scheduler: the foreground producer loop
//!
//! Each iteration handles pending input, tops the ring up when it has fallen
//! below the low-water mark, opens the audio gate after the first fill, and
//! renders a visualization frame when one is due.
//!
//! ```text
//!  Priming ──first fill──► Playing ──decode failure──► Draining ──ring empty──► Finished
//!     │                       │                                                   ▲
//!     └───────────────────────┴───────────────────quit────────────────────────────┘
//! ```
//!
//! Decoding always happens into the scheduler's own scratch buffer; the ring
//! lock is only taken to query the level and to commit the decoded block.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{AudioError, AudioOutput};
use crate::emu::EmuError;
use crate::input::{Action, Debouncer, KeyEvent};
use crate::ring::SharedRingBuffer;
use crate::session::DecodeSession;
use crate::types::{whole_frames, Sample};
use crate::visual::{VisualizationFrame, VisualizationSampler};

/// Upper bound on input events handled per iteration
const MAX_EVENTS_PER_TICK: usize = 16;

/// Source of raw key transitions; must not block
pub trait InputSource {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>>;
}

/// Snapshot of what is playing, handed to the renderer with each frame
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus<'a> {
    pub track_index: usize,
    pub track_count: usize,
    pub song: &'a str,
    pub elapsed_ms: u64,
    pub play_length_ms: i32,
    /// Samples waiting in the ring
    pub buffered: usize,
    pub state: PlaybackState,
}

/// Presentation surface for frames and operator messages
pub trait FrameRenderer {
    fn present(&mut self, frame: &VisualizationFrame, status: &PlaybackStatus<'_>) -> io::Result<()>;

    /// One line of operator feedback (voice toggles, track changes, errors)
    fn message(&mut self, text: &str) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for the first fill; audio output not started
    Priming,
    Playing,
    /// Producer stopped after a decode failure; consumer empties the ring
    Draining,
    Finished,
}

/// Why the loop ended
#[derive(Debug)]
pub enum FinishReason {
    Quit,
    /// The decoder stopped producing; everything buffered was played
    DecodeFailure(EmuError),
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Input error: {0}")]
    Input(#[source] io::Error),

    #[error("Display error: {0}")]
    Render(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Refill when fewer samples than this are buffered
    pub low_water_samples: usize,
    /// Sleep between iterations
    pub tick: Duration,
}

impl PlaybackConfig {
    /// Refill below half of one callback period, 2 ms tick
    pub fn for_period(period_samples: usize) -> Self {
        Self {
            low_water_samples: whole_frames(period_samples / 2),
            tick: Duration::from_millis(2),
        }
    }
}

pub struct PlaybackScheduler<O: AudioOutput> {
    session: DecodeSession,
    ring: SharedRingBuffer,
    output: O,
    sampler: Option<VisualizationSampler>,
    debouncer: Debouncer,
    /// Decode target, one ring capacity long
    scratch: Vec<Sample>,
    config: PlaybackConfig,
    state: PlaybackState,
    failure: Option<EmuError>,
    quit: bool,
    refills: u64,
    underruns: Option<Arc<AtomicU64>>,
    reported_underruns: u64,
}

impl<O: AudioOutput> PlaybackScheduler<O> {
    pub fn new(
        session: DecodeSession,
        ring: SharedRingBuffer,
        output: O,
        config: PlaybackConfig,
    ) -> Self {
        let low_water = config.low_water_samples.min(ring.capacity());
        Self {
            scratch: vec![0; ring.capacity()],
            session,
            ring,
            output,
            sampler: None,
            debouncer: Debouncer::new(),
            config: PlaybackConfig {
                low_water_samples: low_water,
                ..config
            },
            state: PlaybackState::Priming,
            failure: None,
            quit: false,
            refills: 0,
            underruns: None,
            reported_underruns: 0,
        }
    }

    pub fn with_visualization(mut self, sampler: VisualizationSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Watch the callback's underrun counter and log changes
    pub fn with_underrun_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.underruns = Some(counter);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> &DecodeSession {
        &self.session
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Successful refills so far
    pub fn refills(&self) -> u64 {
        self.refills
    }

    /// Loop until finished, sleeping one tick between iterations
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn FrameRenderer,
    ) -> Result<FinishReason, PlaybackError> {
        log::info!(
            "Playback loop starting (ring {} samples, low water {})",
            self.ring.capacity(),
            self.config.low_water_samples
        );
        while self.step(input, renderer, Instant::now())? != PlaybackState::Finished {
            thread::sleep(self.config.tick);
        }
        Ok(self.finish_reason())
    }

    /// One loop iteration
    pub fn step(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn FrameRenderer,
        now: Instant,
    ) -> Result<PlaybackState, PlaybackError> {
        if self.state == PlaybackState::Finished {
            return Ok(self.state);
        }

        self.handle_input(input, renderer)?;
        if self.quit {
            self.state = PlaybackState::Finished;
            return Ok(self.state);
        }

        match self.state {
            PlaybackState::Priming => {
                self.refill(renderer)?;
                // Gate opens after the first fill attempt; a failed first
                // decode still plays whatever it managed to buffer
                if self.ring.available_to_read() > 0 {
                    self.output.start()?;
                    if self.state == PlaybackState::Priming {
                        self.state = PlaybackState::Playing;
                    }
                }
            }
            PlaybackState::Playing => {
                if self.ring.available_to_read() < self.config.low_water_samples {
                    self.refill(renderer)?;
                }
            }
            PlaybackState::Draining | PlaybackState::Finished => {}
        }

        if self.state == PlaybackState::Draining && self.ring.available_to_read() == 0 {
            log::info!("Buffered audio drained");
            self.state = PlaybackState::Finished;
            return Ok(self.state);
        }

        self.check_underruns();
        self.render(renderer, now)?;
        Ok(self.state)
    }

    fn handle_input(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn FrameRenderer,
    ) -> Result<(), PlaybackError> {
        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(event) = input.poll().map_err(PlaybackError::Input)? else {
                break;
            };
            if let Some(action) = self.debouncer.feed(event) {
                self.apply(action, renderer)?;
            }
            if self.quit {
                break;
            }
        }
        Ok(())
    }

    fn apply(&mut self, action: Action, renderer: &mut dyn FrameRenderer) -> Result<(), PlaybackError> {
        log::debug!("Action: {:?}", action);
        match action {
            Action::Quit => self.quit = true,
            Action::ToggleVoice(voice) => {
                if let Some(muted) = self.session.toggle_voice(voice) {
                    let text = format!(
                        "voice {} ({}) {}",
                        voice,
                        self.session.voice_name(voice),
                        if muted { "muted" } else { "unmuted" }
                    );
                    renderer.message(&text).map_err(PlaybackError::Render)?;
                }
            }
            Action::SeekTrack(step) => {
                if self.state == PlaybackState::Draining {
                    return Ok(());
                }
                match self.session.seek_track(step) {
                    Ok(true) => {
                        let text = format!(
                            "playing track {}/{}: {}",
                            self.session.track_index() + 1,
                            self.session.track_count(),
                            self.session.track_info().song
                        );
                        renderer.message(&text).map_err(PlaybackError::Render)?;
                    }
                    Ok(false) => {}
                    Err(e) => self.fail(e, renderer)?,
                }
            }
        }
        Ok(())
    }

    /// Fill the ring to capacity; decode outside the lock, commit under it
    fn refill(&mut self, renderer: &mut dyn FrameRenderer) -> Result<(), PlaybackError> {
        let deficit = whole_frames(self.ring.available_to_write());
        if deficit == 0 {
            return Ok(());
        }

        let block = &mut self.scratch[..deficit];
        match self.session.produce(block) {
            Ok(()) => {
                let committed = self.ring.write(block);
                debug_assert_eq!(committed, deficit);
                self.refills += 1;
                Ok(())
            }
            Err(e) => self.fail(e, renderer),
        }
    }

    /// Stop producing and report the failure once
    fn fail(&mut self, error: EmuError, renderer: &mut dyn FrameRenderer) -> Result<(), PlaybackError> {
        log::warn!("Decoder stopped: {}", error);
        renderer
            .message(&error.to_string())
            .map_err(PlaybackError::Render)?;
        self.failure = Some(error);
        self.state = PlaybackState::Draining;
        Ok(())
    }

    fn check_underruns(&mut self) {
        let Some(counter) = &self.underruns else { return };
        let seen = counter.load(Ordering::Relaxed);
        if seen > self.reported_underruns && self.state == PlaybackState::Playing {
            log::debug!("Audio underruns: {}", seen);
        }
        self.reported_underruns = seen;
    }

    fn render(&mut self, renderer: &mut dyn FrameRenderer, now: Instant) -> Result<(), PlaybackError> {
        let Some(sampler) = self.sampler.as_mut() else {
            return Ok(());
        };
        let Some(frame) = sampler.tick(&self.ring, now) else {
            return Ok(());
        };
        let info = self.session.track_info();
        let status = PlaybackStatus {
            track_index: self.session.track_index(),
            track_count: self.session.track_count(),
            song: &info.song,
            elapsed_ms: self.session.elapsed_ms(),
            play_length_ms: info.play_length_ms,
            buffered: self.ring.available_to_read(),
            state: self.state,
        };
        renderer.present(frame, &status).map_err(PlaybackError::Render)
    }

    fn finish_reason(&mut self) -> FinishReason {
        match self.failure.take() {
            Some(error) if !self.quit => FinishReason::DecodeFailure(error),
            _ => FinishReason::Quit,
        }
    }
}
