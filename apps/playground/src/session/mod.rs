//! Client side of one execution run.
//!
//! A [`SessionConnection`] owns at most one live connection. Each call to
//! [`SessionConnection::start`] retires whatever connection came before it
//! and opens a fresh one under a new [`SessionId`]; transport signals from
//! any other session are ignored, which is what guarantees that nothing from
//! a superseded run is processed once `start` has returned.
//!
//! ```text
//! Idle --start--> Connecting --opened/send RUN--> Open --EXIT/close/error--> Closed
//!                      \______________close/error________________________/
//! ```

use playground_proto::{decode_server, Direction, Frame, FrameError, FrameKind};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::telemetry;
use crate::transport::{
    ConnectionHandle, Connector, SessionId, SignalSender, TransportError, TransportEvent,
    TransportSignal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server sent `EXIT:`.
    Exit,
    /// The server closed the connection without an exit summary.
    Peer,
    /// Connect failure or mid-run drop.
    Failed(String),
    /// Closed locally via [`SessionConnection::close`].
    Local,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("program is not running (session is {state:?})")]
    NotRunning { state: SessionState },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Receives decoded frames and the close notification of the current session.
pub trait SessionHandler {
    fn on_output(&mut self, payload: &str);
    fn on_error(&mut self, payload: &str);
    fn on_exit(&mut self, payload: &str);
    /// Called once per session when it reaches `Closed`, except when the
    /// session was superseded by `start`.
    fn on_closed(&mut self, reason: &CloseReason);
}

pub struct SessionConnection<C> {
    connector: C,
    events: SignalSender,
    current: Option<SessionId>,
    next_id: u64,
    state: SessionState,
    handle: Option<ConnectionHandle>,
    pending_run: Option<String>,
}

impl<C: Connector> SessionConnection<C> {
    /// `events` is the sending half of the channel the caller drains into
    /// [`SessionConnection::handle`].
    pub fn new(connector: C, events: SignalSender) -> Self {
        Self {
            connector,
            events,
            current: None,
            next_id: 0,
            state: SessionState::Idle,
            handle: None,
            pending_run: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.current
    }

    /// Opens a new session that will run `source` once connected.
    pub fn start(&mut self, source: impl Into<String>) -> SessionId {
        if let Some(previous) = self.current {
            if matches!(self.state, SessionState::Connecting | SessionState::Open) {
                debug!(target: "playground::session", session = %previous, "superseded by new run");
            }
            self.retire();
        }

        self.next_id += 1;
        let session = SessionId(self.next_id);
        self.current = Some(session);
        self.pending_run = Some(source.into());
        self.state = SessionState::Connecting;
        self.handle = Some(self.connector.connect(session, self.events.clone()));
        debug!(target: "playground::session", %session, "connecting");
        session
    }

    /// Sends one line of program input. Only valid while `Open`; nothing is
    /// queued for later.
    pub fn send_input(&mut self, text: &str) -> Result<(), SessionError> {
        let handle = match (self.state, self.handle.as_ref()) {
            (SessionState::Open, Some(handle)) => handle,
            (state, _) => return Err(SessionError::NotRunning { state }),
        };
        let wire = Frame::input(text).to_wire(Direction::ClientToServer)?;
        handle.send(wire)?;
        trace!(target: "playground::session", session = %handle.session(), "input sent");
        Ok(())
    }

    /// Closes the current session from this side. Returns `false` if there
    /// was nothing to close.
    pub fn close<H: SessionHandler>(&mut self, handler: &mut H) -> bool {
        self.finish(CloseReason::Local, handler)
    }

    /// Applies one transport signal. Signals for other sessions, and anything
    /// arriving after `Closed`, are dropped.
    pub fn handle<H: SessionHandler>(&mut self, signal: TransportSignal, handler: &mut H) {
        let TransportSignal { session, event } = signal;
        if self.current != Some(session) {
            trace!(target: "playground::session", %session, ?event, "stale signal dropped");
            return;
        }

        match (self.state, event) {
            (SessionState::Connecting, TransportEvent::Opened) => {
                self.state = SessionState::Open;
                debug!(target: "playground::session", %session, "open");
                self.send_pending_run(handler);
            }
            (SessionState::Open, TransportEvent::Message(text)) => {
                self.dispatch(session, &text, handler);
            }
            (
                SessionState::Connecting | SessionState::Open,
                TransportEvent::Closed,
            ) => {
                self.finish(CloseReason::Peer, handler);
            }
            (
                SessionState::Connecting | SessionState::Open,
                TransportEvent::Failed(reason),
            ) => {
                self.finish(CloseReason::Failed(reason), handler);
            }
            (state, event) => {
                trace!(target: "playground::session", %session, ?state, ?event, "signal ignored");
            }
        }
    }

    fn send_pending_run<H: SessionHandler>(&mut self, handler: &mut H) {
        let Some(source) = self.pending_run.take() else {
            return;
        };
        let sent = match (self.handle.as_ref(), Frame::run(source).to_wire(Direction::ClientToServer)) {
            (Some(handle), Ok(wire)) => handle.send(wire).map_err(SessionError::from),
            (None, _) => Err(SessionError::Transport(TransportError::Closed)),
            (_, Err(err)) => Err(err.into()),
        };
        if let Err(err) = sent {
            warn!(target: "playground::session", error = %err, "failed to send run request");
            self.finish(CloseReason::Failed(err.to_string()), handler);
        }
    }

    fn dispatch<H: SessionHandler>(&mut self, session: SessionId, text: &str, handler: &mut H) {
        let Some(frame) = decode_server(text) else {
            debug!(
                target: "playground::session",
                %session,
                frame = %telemetry::preview(text, 48),
                "unrecognized frame dropped"
            );
            return;
        };
        trace!(target: "playground::session", %session, kind = frame.kind.as_str(), "frame");
        match frame.kind {
            FrameKind::Output => handler.on_output(&frame.payload),
            FrameKind::Error => handler.on_error(&frame.payload),
            FrameKind::Exit => {
                handler.on_exit(&frame.payload);
                self.finish(CloseReason::Exit, handler);
            }
            FrameKind::Run | FrameKind::Input => {}
        }
    }

    fn finish<H: SessionHandler>(&mut self, reason: CloseReason, handler: &mut H) -> bool {
        if !matches!(self.state, SessionState::Connecting | SessionState::Open) {
            return false;
        }
        self.retire();
        debug!(
            target: "playground::session",
            session = ?self.current,
            ?reason,
            "closed"
        );
        handler.on_closed(&reason);
        true
    }

    /// Drops the live connection without telling the handler.
    fn retire(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.pending_run = None;
        if self.current.is_some() {
            self.state = SessionState::Closed;
        }
    }
}
