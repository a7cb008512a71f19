//! crossterm front end: keyboard input and the waveform view
//!
//! Raw mode is needed to see individual key presses. Terminals that support
//! the keyboard enhancement protocol report real key releases; elsewhere a
//! release is synthesized right after each press so the debouncer sees one
//! action per press (autorepeat then shows up as repeated presses).

use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, Clear, ClearType,
    EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};

use gme_core::input::{Key, KeyEvent};
use gme_core::scheduler::{FrameRenderer, InputSource, PlaybackState, PlaybackStatus};
use gme_core::visual::VisualizationFrame;

/// Operator messages kept on screen
const MESSAGE_LINES: usize = 4;

/// Raw mode (and optionally the alternate screen) for as long as it lives
pub struct TerminalGuard {
    alternate: bool,
    enhanced: bool,
}

impl TerminalGuard {
    pub fn enter(alternate: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if alternate {
            execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        }
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        log::debug!("Terminal ready (alternate screen: {}, key releases: {})", alternate, enhanced);
        Ok(Self {
            alternate,
            enhanced,
        })
    }

    /// Whether the terminal reports key releases
    pub fn reports_releases(&self) -> bool {
        self.enhanced
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.enhanced {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        if self.alternate {
            let _ = execute!(stdout, cursor::Show, LeaveAlternateScreen);
        }
        let _ = disable_raw_mode();
    }
}

/// Map a terminal key to a player key; Ctrl-C counts as Escape
pub fn map_key(event: &TermKeyEvent) -> Key {
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Escape,
        KeyCode::Esc => Key::Escape,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Char(c) => match c.to_digit(10) {
            Some(d) => Key::Digit(d as u8),
            None => Key::Other,
        },
        _ => Key::Other,
    }
}

pub struct TerminalInput {
    reports_releases: bool,
    pending_release: Option<Key>,
}

impl TerminalInput {
    pub fn new(reports_releases: bool) -> Self {
        Self {
            reports_releases,
            pending_release: None,
        }
    }

    fn translate(&mut self, event: &TermKeyEvent) -> KeyEvent {
        let key = map_key(event);
        match event.kind {
            KeyEventKind::Release => KeyEvent::Up(key),
            KeyEventKind::Repeat => KeyEvent::Down(key),
            KeyEventKind::Press => {
                if !self.reports_releases {
                    self.pending_release = Some(key);
                }
                KeyEvent::Down(key)
            }
        }
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
        if let Some(key) = self.pending_release.take() {
            return Ok(Some(KeyEvent::Up(key)));
        }
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                return Ok(Some(self.translate(&key)));
            }
        }
        Ok(None)
    }
}

/// Two pixel rows per text row using half blocks
pub fn frame_lines(frame: &VisualizationFrame) -> Vec<String> {
    let rows: Vec<&[bool]> = frame.rows().collect();
    rows.chunks(2)
        .map(|pair| {
            let top = pair[0];
            let bottom = pair.get(1).copied();
            top.iter()
                .enumerate()
                .map(|(x, &upper)| {
                    let lower = bottom.is_some_and(|row| row[x]);
                    match (upper, lower) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect()
        })
        .collect()
}

fn clock(ms: u64) -> String {
    format!("{:02}:{:02}", ms / 60_000, (ms / 1000) % 60)
}

/// One-line summary shown above the waveform
pub fn status_line(status: &PlaybackStatus<'_>) -> String {
    let state = match status.state {
        PlaybackState::Priming => " [starting]",
        PlaybackState::Draining => " [ending]",
        PlaybackState::Playing | PlaybackState::Finished => "",
    };
    format!(
        "track {}/{}: {}  {} / {}  buffered {}{}",
        status.track_index + 1,
        status.track_count,
        status.song,
        clock(status.elapsed_ms),
        clock(status.play_length_ms.max(0) as u64),
        status.buffered,
        state
    )
}

/// Full-screen view: header, status, waveform, recent messages
pub struct TerminalRenderer {
    out: Stdout,
    header: Vec<String>,
    messages: VecDeque<String>,
    waveform_rows: u16,
}

impl TerminalRenderer {
    pub fn new(header: Vec<String>, pixel_height: usize) -> Self {
        Self {
            out: io::stdout(),
            header,
            messages: VecDeque::with_capacity(MESSAGE_LINES),
            waveform_rows: pixel_height.div_ceil(2) as u16,
        }
    }

    fn line(&mut self, row: u16, text: &str) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        self.out.write_all(text.as_bytes())
    }

    fn messages_top(&self) -> u16 {
        self.header.len() as u16 + 2 + self.waveform_rows
    }

    fn draw_messages(&mut self) -> io::Result<()> {
        let top = self.messages_top();
        let messages: Vec<String> = self.messages.iter().cloned().collect();
        for i in 0..MESSAGE_LINES {
            let text = messages.get(i).map(String::as_str).unwrap_or("");
            self.line(top + i as u16, text)?;
        }
        Ok(())
    }
}

impl FrameRenderer for TerminalRenderer {
    fn present(&mut self, frame: &VisualizationFrame, status: &PlaybackStatus<'_>) -> io::Result<()> {
        let header = self.header.clone();
        for (row, text) in header.iter().enumerate() {
            self.line(row as u16, text)?;
        }
        let base = header.len() as u16;
        self.line(base, &status_line(status))?;
        for (i, text) in frame_lines(frame).iter().enumerate() {
            self.line(base + 1 + i as u16, text)?;
        }
        self.draw_messages()?;
        self.out.flush()
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        if self.messages.len() == MESSAGE_LINES {
            self.messages.pop_front();
        }
        self.messages.push_back(text.to_string());
        self.draw_messages()?;
        self.out.flush()
    }
}

/// Line-by-line output for `--no-visual`
pub struct LineRenderer<W: Write> {
    out: W,
}

impl<W: Write> LineRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> FrameRenderer for LineRenderer<W> {
    fn present(&mut self, _frame: &VisualizationFrame, _status: &PlaybackStatus<'_>) -> io::Result<()> {
        Ok(())
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        // Raw mode: explicit carriage return
        write!(self.out, "{}\r\n", text)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use gme_core::ring::SharedRingBuffer;
    use gme_core::visual::VisualizationSampler;
    use std::time::Instant;

    fn term_key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> TermKeyEvent {
        TermKeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> TermKeyEvent {
        term_key(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(&press(KeyCode::Esc)), Key::Escape);
        assert_eq!(
            map_key(&term_key(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press)),
            Key::Escape
        );
        assert_eq!(map_key(&press(KeyCode::Char('c'))), Key::Other);
        assert_eq!(map_key(&press(KeyCode::Char('0'))), Key::Digit(0));
        assert_eq!(map_key(&press(KeyCode::Char('7'))), Key::Digit(7));
        assert_eq!(map_key(&press(KeyCode::Left)), Key::Left);
        assert_eq!(map_key(&press(KeyCode::Right)), Key::Right);
        assert_eq!(map_key(&press(KeyCode::Enter)), Key::Other);
    }

    #[test]
    fn test_release_synthesized_without_enhancement() {
        let mut input = TerminalInput::new(false);
        assert_eq!(input.translate(&press(KeyCode::Char('3'))), KeyEvent::Down(Key::Digit(3)));
        assert_eq!(input.pending_release, Some(Key::Digit(3)));
        assert_eq!(input.poll().unwrap(), Some(KeyEvent::Up(Key::Digit(3))));
    }

    #[test]
    fn test_real_releases_pass_through() {
        let mut input = TerminalInput::new(true);
        assert_eq!(input.translate(&press(KeyCode::Left)), KeyEvent::Down(Key::Left));
        assert_eq!(input.pending_release, None);
        let release = term_key(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(input.translate(&release), KeyEvent::Up(Key::Left));
        let repeat = term_key(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Repeat);
        assert_eq!(input.translate(&repeat), KeyEvent::Down(Key::Left));
    }

    #[test]
    fn test_half_block_rendering() {
        let ring = SharedRingBuffer::new(64);
        ring.write(&[i16::MAX, i16::MAX, i16::MAX, i16::MAX]);
        let mut sampler = VisualizationSampler::new(30, 2, 3, 4);
        let frame = sampler.tick(&ring, Instant::now()).unwrap();
        let lines = frame_lines(frame);
        assert_eq!(lines, vec!["▀▀".to_string(), "  ".to_string()]);
    }

    #[test]
    fn test_status_line() {
        let status = PlaybackStatus {
            track_index: 1,
            track_count: 3,
            song: "Green Hill",
            elapsed_ms: 75_500,
            play_length_ms: 150_000,
            buffered: 4096,
            state: PlaybackState::Draining,
        };
        assert_eq!(
            status_line(&status),
            "track 2/3: Green Hill  01:15 / 02:30  buffered 4096 [ending]"
        );
    }

    #[test]
    fn test_line_renderer_uses_crlf() {
        let mut renderer = LineRenderer::new(Vec::new());
        renderer.message("voice 1 muted").unwrap();
        assert_eq!(renderer.out, b"voice 1 muted\r\n".to_vec());
    }
}
