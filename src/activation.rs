//! Single-instance guard and activation channel over a loopback TCP port.
//!
//! The first process binds the port and listens for activation tokens. A
//! later process finds the port taken, sends the token to the running one
//! and exits.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

pub const ACTIVATION_TOKEN: &[u8] = b"ACTIVATE_CAPTURE";

const ACCEPT_POLL: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_MESSAGE_LEN: usize = 1024;
pub const SIGNAL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Failed to configure activation listener: {0}")]
    Listener(#[from] io::Error),
    #[error("Failed to spawn activation thread: {0}")]
    Spawn(io::Error),
}

/// Outcome of trying to claim the activation port.
#[derive(Debug)]
pub enum InstanceRole {
    /// This process owns the port. `None` when binding failed for a reason
    /// other than another instance holding it; the tool then runs without
    /// remote activation.
    Primary(Option<TcpListener>),
    /// Another instance already owns the port.
    Secondary,
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

pub fn acquire(port: u16) -> InstanceRole {
    match TcpListener::bind(loopback(port)) {
        Ok(listener) => {
            debug!("activation port {} bound", port);
            InstanceRole::Primary(Some(listener))
        }
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            info!("activation port {} in use, another instance is running", port);
            InstanceRole::Secondary
        }
        Err(e) => {
            warn!("cannot bind activation port {}: {}", port, e);
            InstanceRole::Primary(None)
        }
    }
}

/// Sends the activation token to the instance owning `port`.
pub fn signal_existing(port: u16, timeout: Duration) -> bool {
    let sent = TcpStream::connect_timeout(&loopback(port), timeout)
        .and_then(|mut stream| stream.write_all(ACTIVATION_TOKEN));
    match sent {
        Ok(()) => {
            debug!("activation sent to port {}", port);
            true
        }
        Err(e) => {
            warn!("failed to signal running instance on port {}: {}", port, e);
            false
        }
    }
}

/// Background accept loop. Each connection carrying exactly the activation
/// token sets the shared request flag; anything else is ignored.
pub struct ActivationListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ActivationListener {
    pub fn spawn(listener: TcpListener, requested: Arc<AtomicBool>) -> Result<Self, ActivationError> {
        listener.set_nonblocking(true)?;
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("activation".into())
            .spawn(move || accept_loop(listener, requested, thread_stop))
            .map_err(ActivationError::Spawn)?;
        Ok(ActivationListener {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the accept loop and waits for the thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("activation thread panicked");
            }
            debug!("activation listener stopped");
        }
    }
}

impl Drop for ActivationListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, requested: Arc<AtomicBool>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if read_token(stream) {
                    debug!("activation request from {}", peer);
                    requested.store(true, Ordering::SeqCst);
                } else {
                    debug!("ignored message from {}", peer);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!("activation accept failed: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn read_token(mut stream: TcpStream) -> bool {
    // Accepted sockets may inherit non-blocking mode from the listener.
    if stream.set_nonblocking(false).is_err() || stream.set_read_timeout(Some(READ_TIMEOUT)).is_err() {
        return false;
    }
    let mut buf = [0u8; MAX_MESSAGE_LEN];
    match stream.read(&mut buf) {
        Ok(n) => &buf[..n] == ACTIVATION_TOKEN,
        Err(e) => {
            debug!("activation read failed: {}", e);
            false
        }
    }
}
