//! Global capture hotkeys: PrintScreen and Ctrl+Shift+4.
//!
//! A forwarding thread drains `GlobalHotKeyEvent::receiver()` and only sets
//! the shared request flag; the main loop decides what to do with it.
//!
//! The manager delivers key presses through the native event loop of the
//! thread that created it (a win32 message queue on Windows, the main run
//! loop on macOS). That thread has to call [`pump_events`] regularly or no
//! event ever reaches the receiver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, info, warn};
use thiserror::Error;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);
const PUMP_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("Failed to create hotkey manager: {0}")]
    Manager(global_hotkey::Error),
    #[error("Failed to register {name}: {source}")]
    Register {
        name: &'static str,
        source: global_hotkey::Error,
    },
    #[error("Failed to spawn hotkey thread: {0}")]
    Spawn(std::io::Error),
}

pub fn capture_hotkeys() -> [(&'static str, HotKey); 2] {
    [
        ("PrintScreen", HotKey::new(None, Code::PrintScreen)),
        (
            "Ctrl+Shift+4",
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::Digit4),
        ),
    ]
}

pub struct HotkeyListener {
    manager: Option<GlobalHotKeyManager>,
    hotkeys: Vec<HotKey>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyListener {
    /// Registers the capture hotkeys. A hotkey that cannot be registered
    /// (e.g. grabbed by another program) is skipped with a warning; it is an
    /// error only when none of them could be registered.
    pub fn start(requested: Arc<AtomicBool>) -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(HotkeyError::Manager)?;

        let mut hotkeys = Vec::new();
        let mut last_error = None;
        for (name, hotkey) in capture_hotkeys() {
            match manager.register(hotkey) {
                Ok(()) => {
                    info!("registered hotkey {}", name);
                    hotkeys.push(hotkey);
                }
                Err(source) => {
                    warn!("cannot register hotkey {}: {}", name, source);
                    last_error = Some(HotkeyError::Register { name, source });
                }
            }
        }
        if let Some(e) = last_error.filter(|_| hotkeys.is_empty()) {
            return Err(e);
        }

        let ids: Vec<u32> = hotkeys.iter().map(HotKey::id).collect();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("hotkey".into())
            .spawn(move || forward_events(&ids, &requested, &thread_stop))
            .map_err(HotkeyError::Spawn)?;

        Ok(HotkeyListener {
            manager: Some(manager),
            hotkeys,
            stop,
            handle: Some(handle),
        })
    }

    /// Unregisters the hotkeys and stops the forwarding thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("hotkey thread panicked");
            }
        }
        if let Some(manager) = self.manager.take() {
            if let Err(e) = manager.unregister_all(&self.hotkeys) {
                warn!("failed to unregister hotkeys: {}", e);
            }
            debug!("hotkeys released");
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Dispatches whatever is pending in this thread's native event queue and
/// returns without waiting.
#[cfg(windows)]
pub fn pump_events() {
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage,
    };

    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while PeekMessageW(&mut msg, std::ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Dispatches whatever is pending in this thread's native event queue and
/// returns without waiting.
#[cfg(target_os = "macos")]
pub fn pump_events() {
    use objc2_core_foundation::{CFRunLoopRunInMode, kCFRunLoopDefaultMode};

    // A zero timeout handles the ready sources and returns.
    unsafe {
        CFRunLoopRunInMode(kCFRunLoopDefaultMode, 0.0, false);
    }
}

/// X11 events are read by the manager's own thread.
#[cfg(not(any(windows, target_os = "macos")))]
pub fn pump_events() {}

/// Pumps native events until `timeout` has passed.
pub fn pump_for(timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        pump_events();
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(PUMP_SLICE.min(deadline - now));
    }
}

fn forward_events(ids: &[u32], requested: &AtomicBool, stop: &AtomicBool) {
    let receiver = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::SeqCst) {
        let Ok(event) = receiver.recv_timeout(RECV_TIMEOUT) else {
            continue;
        };
        if event.state() == HotKeyState::Pressed && ids.contains(&event.id()) {
            debug!("capture hotkey pressed");
            requested.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_hotkeys_are_distinct() {
        let [(_, print), (_, combo)] = capture_hotkeys();
        assert_ne!(print.id(), combo.id());
        assert_eq!(combo.key, Code::Digit4);
        assert!(combo.mods.contains(Modifiers::CONTROL | Modifiers::SHIFT));
        assert!(print.mods.is_empty());
    }

    #[test]
    fn pump_for_waits_out_the_timeout_without_blocking() {
        pump_events();
        let started = Instant::now();
        pump_for(Duration::from_millis(30));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[cfg(windows)]
    #[test]
    fn pump_drains_thread_message_queue() {
        use windows_sys::Win32::System::Threading::GetCurrentThreadId;
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            MSG, PM_NOREMOVE, PeekMessageW, PostThreadMessageW, WM_APP,
        };

        // The first peek creates the queue.
        pump_events();
        unsafe {
            assert_ne!(PostThreadMessageW(GetCurrentThreadId(), WM_APP, 0, 0), 0);
            pump_events();
            let mut msg: MSG = std::mem::zeroed();
            assert_eq!(PeekMessageW(&mut msg, std::ptr::null_mut(), 0, 0, PM_NOREMOVE), 0);
        }
    }

    #[test]
    fn zero_timeout_pumps_once_and_returns() {
        let started = Instant::now();
        pump_for(Duration::ZERO);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
