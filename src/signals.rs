//! SIGINT/SIGTERM handling. The handler only records the request; the main
//! loop picks it up on its next poll and runs the normal teardown.

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIT_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn install() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        #[cfg(unix)]
        unsafe {
            let handler = quit_handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
            libc::signal(libc::SIGTERM, handler);
            libc::signal(libc::SIGINT, handler);
        }
        log::debug!("signal handlers installed");
    });
}

pub fn quit_requested() -> bool {
    QUIT_REQUESTED.load(Ordering::Relaxed)
}

#[cfg(unix)]
extern "C" fn quit_handler(_: libc::c_int) {
    QUIT_REQUESTED.store(true, Ordering::Relaxed);
}
