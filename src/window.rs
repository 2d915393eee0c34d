//! minifb overlay window. Polls mouse and keyboard state every frame and
//! turns the differences into `InputHandler` calls.

use std::time::Instant;

use minifb::{CursorStyle, Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::input::{CursorHint, InputHandler, KeyInput, ModifierState, SessionAction};
use crate::raster::Framebuffer;
use crate::selection_logic::Point;

const WINDOW_TITLE: &str = "regioncap";
const TARGET_FPS: usize = 60;

pub struct OverlayWindow {
    window: Window,
    framebuffer: Framebuffer,
    pointer: Option<Point>,
    left_down: bool,
    cursor: Option<CursorHint>,
}

impl OverlayWindow {
    /// Opens a borderless, topmost window covering the screen at (0, 0).
    pub fn open(width: usize, height: usize) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            WINDOW_TITLE,
            width,
            height,
            WindowOptions {
                borderless: true,
                title: false,
                resize: false,
                topmost: true,
                ..WindowOptions::default()
            },
        )?;
        window.set_position(0, 0);
        window.set_target_fps(TARGET_FPS);
        Ok(OverlayWindow {
            window,
            framebuffer: Framebuffer::new(width, height),
            pointer: None,
            left_down: false,
            cursor: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Pushes the framebuffer to the screen. Also pumps window events.
    pub fn present(&mut self) -> Result<(), minifb::Error> {
        self.window.update_with_buffer(
            self.framebuffer.pixels(),
            self.framebuffer.width(),
            self.framebuffer.height(),
        )
    }

    /// Pumps window events without redrawing.
    pub fn idle(&mut self) {
        self.window.update();
    }

    /// Delivers this frame's input to `handler`. Stops at the first key
    /// that ends the session.
    pub fn dispatch<H: InputHandler>(&mut self, handler: &mut H, now: Instant) -> SessionAction {
        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            let p = Point::new(mx as i32, my as i32);
            let moved = self.pointer != Some(p);
            let down = self.window.get_mouse_down(MouseButton::Left);
            match (self.left_down, down) {
                (false, true) => handler.on_pointer_down(p),
                (true, false) => handler.on_pointer_up(p),
                _ if moved => handler.on_pointer_move(p),
                _ => {}
            }
            self.left_down = down;
            self.pointer = Some(p);
        }

        let modifiers = ModifierState {
            ctrl: self.window.is_key_down(Key::LeftCtrl) || self.window.is_key_down(Key::RightCtrl),
            shift: self.window.is_key_down(Key::LeftShift)
                || self.window.is_key_down(Key::RightShift),
        };
        for key in self.window.get_keys_pressed(KeyRepeat::Yes) {
            let Some(key) = translate(key) else {
                continue;
            };
            match handler.on_key(key, modifiers, now) {
                SessionAction::Continue => {}
                action => return action,
            }
        }

        let hint = handler.cursor_hint();
        if self.cursor != Some(hint) {
            self.window.set_cursor_style(cursor_style(hint));
            self.cursor = Some(hint);
        }
        SessionAction::Continue
    }
}

fn translate(key: Key) -> Option<KeyInput> {
    Some(match key {
        Key::Left => KeyInput::Left,
        Key::Right => KeyInput::Right,
        Key::Up => KeyInput::Up,
        Key::Down => KeyInput::Down,
        Key::Backspace => KeyInput::Backspace,
        Key::Tab => KeyInput::Tab,
        Key::Enter | Key::NumPadEnter => KeyInput::Enter,
        Key::Escape => KeyInput::Escape,
        Key::I => KeyInput::Char('i'),
        Key::H => KeyInput::Char('h'),
        Key::C => KeyInput::Char('c'),
        _ => return None,
    })
}

fn cursor_style(hint: CursorHint) -> CursorStyle {
    match hint {
        CursorHint::Crosshair => CursorStyle::Crosshair,
        CursorHint::Move => CursorStyle::OpenHand,
        CursorHint::Grabbing => CursorStyle::ClosedHand,
        CursorHint::ResizeHorizontal => CursorStyle::ResizeLeftRight,
        CursorHint::ResizeVertical => CursorStyle::ResizeUpDown,
        CursorHint::ResizeCorner => CursorStyle::ResizeAll,
    }
}
