//! Input contract between the window and the capture session.
//!
//! The session only ever sees [`InputHandler`] calls with plain points and
//! [`KeyInput`] values; `window` is the one place that knows about minifb.

use std::time::Instant;

use crate::capture::CaptureJob;
use crate::selection::Nudge;
use crate::selection_logic::{Handle, Point};

/// Keys the overlay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Left,
    Right,
    Up,
    Down,
    Backspace,
    Tab,
    Enter,
    Escape,
    Char(char),
}

/// Modifier keys held while another key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
}

/// What a key press asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Nudge(Nudge),
    HistoryPrevious,
    HistoryNext,
    Save,
    Copy,
    ToggleInfo,
    ToggleHelp,
    Quit,
}

/// Key bindings of the overlay.
pub fn bind(key: KeyInput, modifiers: ModifierState) -> Option<Command> {
    match key {
        KeyInput::Char(c) if modifiers.ctrl && c.eq_ignore_ascii_case(&'c') => Some(Command::Quit),
        KeyInput::Left => Some(Command::Nudge(Nudge::Left)),
        KeyInput::Right => Some(Command::Nudge(Nudge::Right)),
        KeyInput::Up => Some(Command::Nudge(Nudge::Up)),
        KeyInput::Down => Some(Command::Nudge(Nudge::Down)),
        KeyInput::Backspace => Some(Command::HistoryPrevious),
        KeyInput::Tab => Some(Command::HistoryNext),
        KeyInput::Enter => Some(Command::Save),
        KeyInput::Escape => Some(Command::Copy),
        KeyInput::Char(c) if c.eq_ignore_ascii_case(&'i') => Some(Command::ToggleInfo),
        KeyInput::Char(c) if c.eq_ignore_ascii_case(&'h') => Some(Command::ToggleHelp),
        KeyInput::Char(_) => None,
    }
}

/// Outcome of one input event for the session loop.
#[derive(Debug, Clone)]
pub enum SessionAction {
    Continue,
    /// Hand the job to the output collaborators and end the session.
    Deliver(CaptureJob),
    /// End the session without output.
    Close,
    /// Tear everything down and exit the process.
    Quit,
}

/// Pointer shape the window should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Crosshair,
    Move,
    Grabbing,
    ResizeHorizontal,
    ResizeVertical,
    ResizeCorner,
}

impl CursorHint {
    pub fn for_handle(handle: Option<Handle>) -> Self {
        match handle {
            None => CursorHint::Crosshair,
            Some(Handle::Inside) => CursorHint::Move,
            Some(Handle::Left | Handle::Right) => CursorHint::ResizeHorizontal,
            Some(Handle::Top | Handle::Bottom) => CursorHint::ResizeVertical,
            Some(_) => CursorHint::ResizeCorner,
        }
    }
}

/// Receiver of translated window events.
pub trait InputHandler {
    fn on_pointer_down(&mut self, p: Point);
    fn on_pointer_move(&mut self, p: Point);
    fn on_pointer_up(&mut self, p: Point);
    fn on_key(&mut self, key: KeyInput, modifiers: ModifierState, now: Instant) -> SessionAction;
    fn cursor_hint(&self) -> CursorHint;
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: ModifierState = ModifierState {
        ctrl: false,
        shift: false,
    };
    const CTRL: ModifierState = ModifierState {
        ctrl: true,
        shift: false,
    };

    #[test]
    fn overlay_bindings() {
        assert_eq!(bind(KeyInput::Left, NONE), Some(Command::Nudge(Nudge::Left)));
        assert_eq!(bind(KeyInput::Backspace, NONE), Some(Command::HistoryPrevious));
        assert_eq!(bind(KeyInput::Tab, NONE), Some(Command::HistoryNext));
        assert_eq!(bind(KeyInput::Enter, NONE), Some(Command::Save));
        assert_eq!(bind(KeyInput::Escape, NONE), Some(Command::Copy));
        assert_eq!(bind(KeyInput::Char('I'), NONE), Some(Command::ToggleInfo));
        assert_eq!(bind(KeyInput::Char('h'), NONE), Some(Command::ToggleHelp));
    }

    #[test]
    fn ctrl_c_quits_but_plain_c_does_nothing() {
        assert_eq!(bind(KeyInput::Char('c'), CTRL), Some(Command::Quit));
        assert_eq!(bind(KeyInput::Char('c'), NONE), None);
    }

    #[test]
    fn cursor_for_handles() {
        assert_eq!(CursorHint::for_handle(None), CursorHint::Crosshair);
        assert_eq!(CursorHint::for_handle(Some(Handle::Inside)), CursorHint::Move);
        assert_eq!(CursorHint::for_handle(Some(Handle::Top)), CursorHint::ResizeVertical);
        assert_eq!(CursorHint::for_handle(Some(Handle::BottomLeft)), CursorHint::ResizeCorner);
    }
}
