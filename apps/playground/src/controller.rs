//! Drives a run end to end: console lines, run affordance and diagnostic
//! annotations, on top of a [`SessionConnection`].

use playground_proto::{diagnostics, Diagnostic, ExitSummary};
use tracing::{debug, info};

use crate::session::{CloseReason, SessionConnection, SessionError, SessionHandler, SessionState};
use crate::transport::{Connector, SessionId, SignalSender, TransportSignal};

pub const RUN_BANNER: &str = "--- Compiling & Running ---";
pub const NOT_RUNNING_NOTICE: &str = "Program is not running. Click Run first.";
pub const CONNECTION_ERROR_NOTICE: &str = "Connection Error. Is the server running?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Normal,
    Error,
    System,
    /// Local echo of a line the user typed.
    Input,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAffordance {
    Idle,
    Running,
}

/// Where program output and status lines end up.
pub trait Console {
    fn append(&mut self, text: &str, style: LineStyle);
    fn set_run_affordance(&mut self, affordance: RunAffordance);
}

/// Marks source lines implicated by diagnostics.
pub trait Annotator {
    /// Number of lines in the source being annotated.
    fn line_count(&self) -> usize;
    fn clear(&mut self);
    /// Marks `diagnostic.line`, which is always below `line_count()`.
    fn mark(&mut self, diagnostic: &Diagnostic);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(ExitSummary),
    /// The server closed the connection without an exit summary.
    Disconnected,
    Failed(String),
    Stopped,
}

impl RunOutcome {
    /// Process exit status that best reflects the outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Exited(summary) => summary.code.unwrap_or(0),
            RunOutcome::Disconnected | RunOutcome::Failed(_) => 1,
            RunOutcome::Stopped => 130,
        }
    }
}

pub struct ExecutionController<C, V, A> {
    session: SessionConnection<C>,
    console: V,
    annotator: A,
    running: bool,
    outcome: Option<RunOutcome>,
}

impl<C, V, A> ExecutionController<C, V, A>
where
    C: Connector,
    V: Console,
    A: Annotator,
{
    pub fn new(session: SessionConnection<C>, console: V, annotator: A) -> Self {
        Self {
            session,
            console,
            annotator,
            running: false,
            outcome: None,
        }
    }

    /// Shorthand for a controller over a fresh session on `connector`.
    pub fn with_connector(connector: C, events: SignalSender, console: V, annotator: A) -> Self {
        Self::new(SessionConnection::new(connector, events), console, annotator)
    }

    pub fn run(&mut self, source: &str) -> SessionId {
        self.annotator.clear();
        self.console.append(RUN_BANNER, LineStyle::System);
        self.console.set_run_affordance(RunAffordance::Running);
        self.running = true;
        self.outcome = None;
        let session = self.session.start(source);
        info!(%session, bytes = source.len(), "run requested");
        session
    }

    /// Echoes `line` and forwards it as program input. Never fails: when no
    /// program is running the user gets a notice instead.
    pub fn submit_input(&mut self, line: &str) -> bool {
        self.console.append(&format!("{line} ↵"), LineStyle::Input);
        match self.session.send_input(line) {
            Ok(()) => true,
            Err(err) => {
                if !matches!(err, SessionError::NotRunning { .. }) {
                    debug!(error = %err, "input not delivered");
                }
                self.console.append(NOT_RUNNING_NOTICE, LineStyle::System);
                false
            }
        }
    }

    pub fn handle_signal(&mut self, signal: TransportSignal) {
        let mut dispatch = Dispatch {
            console: &mut self.console,
            annotator: &mut self.annotator,
            running: &mut self.running,
            outcome: &mut self.outcome,
        };
        self.session.handle(signal, &mut dispatch);
    }

    /// Ends the current run from this side.
    pub fn stop(&mut self) -> bool {
        let mut dispatch = Dispatch {
            console: &mut self.console,
            annotator: &mut self.annotator,
            running: &mut self.running,
            outcome: &mut self.outcome,
        };
        self.session.close(&mut dispatch)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn console(&self) -> &V {
        &self.console
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Tears the controller down, closing any live connection without
    /// notifying the collaborators.
    pub fn into_parts(self) -> (V, A, Option<RunOutcome>) {
        (self.console, self.annotator, self.outcome)
    }
}

/// Session handler view over the controller's collaborators.
struct Dispatch<'a, V, A> {
    console: &'a mut V,
    annotator: &'a mut A,
    running: &'a mut bool,
    outcome: &'a mut Option<RunOutcome>,
}

impl<V: Console, A: Annotator> Dispatch<'_, V, A> {
    fn restore_idle(&mut self) {
        if std::mem::replace(self.running, false) {
            self.console.set_run_affordance(RunAffordance::Idle);
        }
    }
}

impl<V: Console, A: Annotator> SessionHandler for Dispatch<'_, V, A> {
    fn on_output(&mut self, payload: &str) {
        self.console.append(payload, LineStyle::Normal);
    }

    fn on_error(&mut self, payload: &str) {
        self.console.append(payload, LineStyle::Error);
        let line_count = self.annotator.line_count();
        for diagnostic in diagnostics(payload) {
            if diagnostic.line < line_count {
                self.annotator.mark(&diagnostic);
            } else {
                debug!(line = diagnostic.line, line_count, "diagnostic outside source skipped");
            }
        }
    }

    fn on_exit(&mut self, payload: &str) {
        self.console.append(&format!("=== {payload} ==="), LineStyle::System);
        *self.outcome = Some(RunOutcome::Exited(ExitSummary::parse(payload)));
        self.restore_idle();
    }

    fn on_closed(&mut self, reason: &CloseReason) {
        match reason {
            CloseReason::Exit => {}
            CloseReason::Peer => {
                self.outcome.get_or_insert(RunOutcome::Disconnected);
            }
            CloseReason::Failed(err) => {
                self.console.append(CONNECTION_ERROR_NOTICE, LineStyle::Error);
                self.outcome.get_or_insert(RunOutcome::Failed(err.clone()));
            }
            CloseReason::Local => {
                self.outcome.get_or_insert(RunOutcome::Stopped);
            }
        }
        self.restore_idle();
    }
}
