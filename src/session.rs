//! One capture attempt, from activation to save, copy or cancel.
//!
//! A session owns everything that is rebuilt per attempt: the frozen
//! screenshot, the selection state machine, the overlay scene and the
//! magnifier. The capture history is not among them; it is borrowed from
//! the process for the session's lifetime so it survives between sessions.

use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use log::{debug, info};

use crate::capture::{CaptureJob, OutputKind};
use crate::history::HistoryNavigator;
use crate::input::{self, Command, CursorHint, InputHandler, KeyInput, ModifierState, SessionAction};
use crate::magnifier::{MagnifierController, MagnifierSettings};
use crate::overlay::{OverlayRenderer, OverlayScene};
use crate::raster::{self, Framebuffer};
use crate::selection::{Nudge, SelectionLimits, SelectionMode, SelectionStateMachine};
use crate::selection_logic::{Handle, Point, Region};
use crate::window::OverlayWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub limits: SelectionLimits,
    pub magnifier: MagnifierSettings,
    pub show_info: bool,
    pub restore_on_activate: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            limits: SelectionLimits::default(),
            magnifier: MagnifierSettings::default(),
            show_info: true,
            restore_on_activate: true,
        }
    }
}

pub struct CaptureSession<'h> {
    history: &'h mut HistoryNavigator,
    frame: Arc<RgbaImage>,
    backdrop: Vec<u32>,
    selection: SelectionStateMachine,
    overlay: OverlayRenderer,
    magnifier: MagnifierController,
    hovered: Option<Handle>,
    dirty: bool,
    history_changed: bool,
}

impl<'h> CaptureSession<'h> {
    pub fn new(
        history: &'h mut HistoryNavigator,
        frame: Arc<RgbaImage>,
        settings: SessionSettings,
    ) -> Self {
        let (width, height) = frame.dimensions();
        let mut session = CaptureSession {
            history,
            backdrop: raster::backdrop_from(&frame),
            frame,
            selection: SelectionStateMachine::new(settings.limits),
            overlay: OverlayRenderer::new(width, height, settings.show_info),
            magnifier: MagnifierController::new(settings.magnifier),
            hovered: None,
            dirty: true,
            history_changed: false,
        };
        if !(settings.restore_on_activate && session.restore_last()) {
            session.refresh();
        }
        session
    }

    pub fn history(&self) -> &HistoryNavigator {
        &*self.history
    }

    pub fn selection(&self) -> &SelectionStateMachine {
        &self.selection
    }

    pub fn region(&self) -> Option<Region> {
        self.selection.region()
    }

    pub fn scene(&self) -> &OverlayScene {
        self.overlay.scene()
    }

    pub fn magnifier(&self) -> &MagnifierController {
        &self.magnifier
    }

    /// Whether anything was committed to history during this session.
    pub fn history_changed(&self) -> bool {
        self.history_changed
    }

    /// Returns whether a redraw is pending, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn render_into(&self, framebuffer: &mut Framebuffer) {
        framebuffer.compose(&self.backdrop, self.overlay.scene(), self.magnifier.view());
    }

    /// Advances timers. Call once per frame.
    pub fn tick(&mut self, now: Instant) {
        if self.magnifier.tick(now) {
            self.dirty = true;
        }
    }

    /// Loads the entry under the history cursor (or the newest one).
    pub fn restore_last(&mut self) -> bool {
        match self.history.restore_last() {
            Some(region) => {
                debug!("restored {:?} from history", region);
                self.selection.load(region);
                self.refresh();
                true
            }
            None => false,
        }
    }

    pub fn history_previous(&mut self) -> bool {
        let recalled = self.history.previous();
        self.load_recalled(recalled)
    }

    pub fn history_next(&mut self) -> bool {
        let recalled = self.history.next();
        self.load_recalled(recalled)
    }

    fn load_recalled(&mut self, recalled: Option<Region>) -> bool {
        let Some(region) = recalled else {
            return false;
        };
        self.selection.load(region);
        self.magnifier.hide();
        self.refresh();
        true
    }

    /// Arrow-key nudge. With nothing selected the last history entry is
    /// restored first.
    pub fn nudge(&mut self, direction: Nudge, now: Instant) -> bool {
        if self.selection.is_dragging() {
            return false;
        }
        if self.selection.selected_region().is_none() && !self.restore_last() {
            return false;
        }
        let Some(region) = self.selection.nudge(direction) else {
            return false;
        };
        self.refresh();
        let handle = self.selection.last_adjust();
        if handle != Handle::Inside {
            self.magnifier
                .show_briefly(&self.frame, region.handle_point(handle), now);
        }
        true
    }

    /// Commits the active region to history and packages it for output.
    ///
    /// With no usable region the last history entry is restored first;
    /// `None` means there is nothing to output at all.
    pub fn prepare_output(&mut self, kind: OutputKind) -> Option<CaptureJob> {
        let min = self.selection.limits().min_size;
        let usable = |r: &Region| r.meets_minimum(min);
        let region = match self.selection.region().filter(usable) {
            Some(region) => region,
            None => {
                if !self.restore_last() {
                    return None;
                }
                self.selection.region().filter(usable)?
            }
        };
        self.history.commit(region);
        self.history_changed = true;
        info!("{:?} requested for {:?}", kind, region);
        Some(CaptureJob {
            kind,
            region,
            frame: Arc::clone(&self.frame),
        })
    }

    fn refresh(&mut self) {
        self.overlay.redraw(self.selection.region());
        self.dirty = true;
    }

    fn show_magnifier(&mut self, focus: Point) {
        self.magnifier.show_at(&self.frame, focus);
        self.dirty = true;
    }

    fn hide_magnifier(&mut self) {
        if self.magnifier.hide() {
            self.dirty = true;
        }
    }

    fn execute(&mut self, command: Command, now: Instant) -> SessionAction {
        match command {
            Command::Nudge(direction) => {
                self.nudge(direction, now);
            }
            Command::HistoryPrevious => {
                self.history_previous();
            }
            Command::HistoryNext => {
                self.history_next();
            }
            Command::Save => {
                // Enter with nothing to save leaves the overlay up.
                if let Some(job) = self.prepare_output(OutputKind::Save) {
                    return SessionAction::Deliver(job);
                }
            }
            Command::Copy => {
                return match self.prepare_output(OutputKind::Copy) {
                    Some(job) => SessionAction::Deliver(job),
                    None => SessionAction::Close,
                };
            }
            Command::ToggleInfo => {
                self.overlay.toggle_info();
                self.refresh();
            }
            Command::ToggleHelp => {
                self.overlay.toggle_help();
                self.dirty = true;
            }
            Command::Quit => return SessionAction::Quit,
        }
        SessionAction::Continue
    }
}

impl InputHandler for CaptureSession<'_> {
    fn on_pointer_down(&mut self, p: Point) {
        match self.selection.pointer_down(p) {
            SelectionMode::Selecting { .. } => self.hide_magnifier(),
            SelectionMode::Resizing { handle, origin } => {
                self.show_magnifier(origin.handle_point_near(handle, p))
            }
            SelectionMode::Moving { .. } | SelectionMode::Idle => {}
        }
        self.hovered = None;
        self.refresh();
    }

    fn on_pointer_move(&mut self, p: Point) {
        if self.selection.is_dragging() {
            let changed = self.selection.pointer_move(p);
            if matches!(
                self.selection.mode(),
                SelectionMode::Selecting { .. } | SelectionMode::Resizing { .. }
            ) {
                self.show_magnifier(p);
            }
            if changed {
                self.refresh();
            }
            return;
        }

        self.hovered = self.selection.hover(p);
        match (self.hovered, self.selection.selected_region()) {
            (Some(handle), Some(region)) if handle != Handle::Inside => {
                self.show_magnifier(region.handle_point_near(handle, p))
            }
            _ => self.hide_magnifier(),
        }
    }

    fn on_pointer_up(&mut self, p: Point) {
        let was = self.selection.mode();
        if !self.selection.pointer_up(p) {
            return;
        }
        if matches!(
            was,
            SelectionMode::Selecting { .. } | SelectionMode::Resizing { .. }
        ) {
            self.hide_magnifier();
        }
        self.hovered = self.selection.hover(p);
        self.refresh();
    }

    fn on_key(&mut self, key: KeyInput, modifiers: ModifierState, now: Instant) -> SessionAction {
        match input::bind(key, modifiers) {
            Some(command) => self.execute(command, now),
            None => SessionAction::Continue,
        }
    }

    fn cursor_hint(&self) -> CursorHint {
        match self.selection.mode() {
            SelectionMode::Idle => CursorHint::for_handle(self.hovered),
            SelectionMode::Selecting { .. } => CursorHint::Crosshair,
            SelectionMode::Moving { .. } => CursorHint::Grabbing,
            SelectionMode::Resizing { handle, .. } => CursorHint::for_handle(Some(handle)),
        }
    }
}

/// Per-session OS resources, released in a fixed order: overlay window
/// first, then the frozen screenshot. Dropping the record releases whatever
/// is still held, so every exit path ends in [`SessionResources::teardown`].
pub struct SessionResources {
    window: Option<OverlayWindow>,
    frame: Option<Arc<RgbaImage>>,
}

impl SessionResources {
    pub fn new(window: OverlayWindow, frame: Arc<RgbaImage>) -> Self {
        SessionResources {
            window: Some(window),
            frame: Some(frame),
        }
    }

    pub fn window_mut(&mut self) -> Option<&mut OverlayWindow> {
        self.window.as_mut()
    }

    /// Takes the overlay off screen while keeping the screenshot alive,
    /// e.g. for the modal save dialog.
    pub fn close_window(&mut self) {
        if self.window.take().is_some() {
            debug!("overlay window closed");
        }
    }

    pub fn teardown(&mut self) {
        self.close_window();
        if self.frame.take().is_some() {
            debug!("frozen screenshot released");
        }
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.teardown();
    }
}
