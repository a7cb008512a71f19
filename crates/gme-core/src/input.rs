//! Keyboard input: logical keys, actions and debouncing
//!
//! Front ends translate their raw events into [`KeyEvent`]s. The
//! [`Debouncer`] turns those into at most one [`Action`] per physical press,
//! however many times the loop polls while the key stays down.

use crate::session::TrackStep;
use crate::types::MAX_VOICES;

/// Keys the player reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Left,
    Right,
    /// Number row key 0-9
    Digit(u8),
    /// Anything else; inert
    Other,
}

/// Raw key transition from the input collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// What the playback loop should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Flip the mute flag of a voice (0-based)
    ToggleVoice(usize),
    SeekTrack(TrackStep),
}

/// Default key map: Escape quits, arrows seek, digit `d` toggles voice `d`
pub fn action_for(key: Key) -> Option<Action> {
    match key {
        Key::Escape => Some(Action::Quit),
        Key::Left => Some(Action::SeekTrack(TrackStep::Previous)),
        Key::Right => Some(Action::SeekTrack(TrackStep::Next)),
        Key::Digit(d) if (d as usize) < MAX_VOICES => Some(Action::ToggleVoice(d as usize)),
        Key::Digit(_) | Key::Other => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceState {
    #[default]
    Idle,
    Held,
}

/// Two-state key debouncer
///
/// `Idle --down--> Held` emits the mapped action and remembers the key; any
/// further down events are swallowed until that key's up returns it to
/// `Idle`. Keys without an action never leave `Idle`.
#[derive(Debug, Default)]
pub struct Debouncer {
    state: DebounceState,
    held: Option<Key>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn feed(&mut self, event: KeyEvent) -> Option<Action> {
        match (self.state, event) {
            (DebounceState::Idle, KeyEvent::Down(key)) => {
                let action = action_for(key)?;
                self.state = DebounceState::Held;
                self.held = Some(key);
                Some(action)
            }
            (DebounceState::Held, KeyEvent::Down(_)) => None,
            (DebounceState::Held, KeyEvent::Up(key)) if self.held == Some(key) => {
                self.state = DebounceState::Idle;
                self.held = None;
                None
            }
            (_, KeyEvent::Up(_)) => None,
        }
    }
}
