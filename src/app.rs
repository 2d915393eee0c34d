//! Process-wide state and the main poll loop.
//!
//! The app owns everything that outlives a capture session: history, the
//! output collaborators (and their remembered save directory) and the two
//! producer threads. Sessions are run synchronously on the calling thread.

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, warn};

use crate::activation::ActivationListener;
use crate::capture::CaptureOutput;
use crate::config::Config;
use crate::history::{HistoryNavigator, HistoryStore};
use crate::hotkey::{self, HotkeyListener};
use crate::input::SessionAction;
use crate::screenshot;
use crate::session::{CaptureSession, SessionResources};
use crate::signals;
use crate::window::OverlayWindow;

/// Capture-request flag shared with the producer threads.
#[derive(Debug, Clone, Default)]
pub struct CaptureRequests(Arc<AtomicBool>);

impl CaptureRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a producer thread.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether a capture was requested, clearing the request.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Finished,
    Quit,
}

pub struct App {
    config: Config,
    history: HistoryNavigator,
    store: Option<HistoryStore>,
    output: CaptureOutput,
    requests: CaptureRequests,
    activation: Option<ActivationListener>,
    hotkeys: Option<HotkeyListener>,
}

impl App {
    /// Starts the producers. Each one that fails to start is logged and the
    /// app runs without it.
    pub fn new(config: Config, activation: Option<TcpListener>, output: CaptureOutput) -> Self {
        let requests = CaptureRequests::new();

        let activation = activation.and_then(|listener| {
            ActivationListener::spawn(listener, requests.flag())
                .map_err(|e| warn!("activation listener unavailable: {}", e))
                .ok()
        });
        let hotkeys = HotkeyListener::start(requests.flag())
            .map_err(|e| warn!("global hotkeys unavailable: {}", e))
            .ok();

        let store = config.persist_history.then(|| {
            HistoryStore::default_location()
                .map_err(|e| warn!("history persistence unavailable: {}", e))
                .ok()
        });
        let store = store.flatten();
        let history = store
            .as_ref()
            .map(|store| store.load_or_empty(config.min_selection_size))
            .unwrap_or_default();
        debug!("starting with {} history entries", history.len());

        App {
            config,
            history,
            store,
            output,
            requests,
            activation,
            hotkeys,
        }
    }

    /// Runs the first capture session right away, then waits for requests
    /// until a quit is requested.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.requests.request();
        let poll = self.config.poll_interval();
        loop {
            if signals::quit_requested() {
                info!("quit requested");
                break;
            }
            if self.requests.take() {
                let end = self.run_session();
                // Requests that piled up while the overlay was open are stale.
                self.requests.clear();
                match end {
                    Ok(SessionEnd::Quit) => break,
                    Ok(SessionEnd::Finished) => {}
                    Err(e) => warn!("capture session failed: {:#}", e),
                }
            }
            hotkey::pump_for(poll);
        }
        Ok(())
    }

    fn run_session(&mut self) -> anyhow::Result<SessionEnd> {
        let frame = match screenshot::capture_primary_monitor() {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                warn!("{}", e);
                return Ok(SessionEnd::Finished);
            }
        };
        let (width, height) = frame.dimensions();
        let window = match OverlayWindow::open(width as usize, height as usize) {
            Ok(window) => window,
            Err(e) => {
                warn!("cannot open overlay window: {}", e);
                return Ok(SessionEnd::Finished);
            }
        };
        let mut resources = SessionResources::new(window, Arc::clone(&frame));
        info!("capture session started ({}x{})", width, height);

        let mut session = CaptureSession::new(&mut self.history, frame, self.config.session_settings());
        let action = loop {
            // Presses during the session are dropped with the stale requests.
            hotkey::pump_events();
            if signals::quit_requested() {
                break SessionAction::Quit;
            }
            let Some(window) = resources.window_mut() else {
                break SessionAction::Close;
            };
            if !window.is_open() {
                break SessionAction::Close;
            }
            match window.dispatch(&mut session, Instant::now()) {
                SessionAction::Continue => {}
                action => break action,
            }
            session.tick(Instant::now());
            if session.take_dirty() {
                session.render_into(window.framebuffer_mut());
                if let Err(e) = window.present() {
                    warn!("overlay update failed: {}", e);
                    break SessionAction::Close;
                }
            } else {
                window.idle();
            }
        };
        let history_changed = session.history_changed();
        drop(session);

        let end = match action {
            SessionAction::Deliver(job) => {
                // The dialog is modal; the overlay must not cover it.
                resources.close_window();
                match self.output.deliver(&job) {
                    Ok(Some(path)) => debug!("delivered to {}", path.display()),
                    Ok(None) => debug!("{:?} finished without a file", job.kind),
                    Err(e) => warn!("{:?} failed: {}", job.kind, e),
                }
                SessionEnd::Finished
            }
            SessionAction::Quit => SessionEnd::Quit,
            SessionAction::Close | SessionAction::Continue => SessionEnd::Finished,
        };
        if history_changed {
            self.persist_history();
        }
        resources.teardown();
        info!("capture session ended");
        Ok(end)
    }

    fn persist_history(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&self.history) {
            warn!("failed to save history to {}: {}", store.path().display(), e);
        }
    }

    /// Releases the process-wide resources: activation port first, then the
    /// hotkeys. Session resources are already gone by the time `run` returns.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(mut activation) = self.activation.take() {
            activation.shutdown();
        }
        if let Some(mut hotkeys) = self.hotkeys.take() {
            hotkeys.shutdown();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
