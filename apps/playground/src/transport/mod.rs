//! Transport seam between the session state machine and the network.
//!
//! A [`Connector`] opens one connection per session and reports everything
//! that happens on it as [`TransportSignal`]s pushed into a single channel
//! owned by the run loop. Signals are tagged with the session that opened the
//! connection so the session can ignore a superseded connection's stragglers.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod websocket;

pub use websocket::WebSocketConnector;

pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Peer closed the connection, or the stream ended.
    Closed,
    /// Connect failure or mid-run drop.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSignal {
    pub session: SessionId,
    pub event: TransportEvent,
}

pub type SignalSender = mpsc::UnboundedSender<TransportSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<TransportSignal>;

pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,
}

/// Opens connections for sessions.
pub trait Connector: Send + Sync {
    /// Starts connecting in the background and returns immediately.
    /// `Opened` (or `Failed`) is reported through `events` once known.
    fn connect(&self, session: SessionId, events: SignalSender) -> ConnectionHandle;
}

/// Owning handle to one live connection.
///
/// Dropping the handle, or calling [`ConnectionHandle::close`], ends the
/// connection: the outbound queue is closed and the transport task winds
/// down on its own.
#[derive(Debug)]
pub struct ConnectionHandle {
    session: SessionId,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn new(
        session: SessionId,
        outbound: mpsc::UnboundedSender<String>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            session,
            outbound: Some(outbound),
            task,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn send(&self, text: String) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound.send(text).map_err(|_| TransportError::Closed)
    }

    /// Closes the outbound queue. The transport task gets [`CLOSE_GRACE`] to
    /// send its close frame before it is aborted.
    pub fn close(&mut self) {
        self.outbound.take();
        let Some(task) = self.task.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let abort = task.abort_handle();
                runtime.spawn(async move {
                    if tokio::time::timeout(CLOSE_GRACE, task).await.is_err() {
                        abort.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}
