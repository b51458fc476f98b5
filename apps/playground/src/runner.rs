//! Event loop for a single run driven from a line-oriented input source.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::annotator::SourceAnnotator;
use crate::controller::{Console, ExecutionController, RunOutcome};
use crate::session::SessionState;
use crate::transport::{signal_channel, Connector};

pub struct RunReport<V> {
    pub outcome: Option<RunOutcome>,
    pub console: V,
    pub annotator: SourceAnnotator,
}

impl<V> RunReport<V> {
    pub fn exit_code(&self) -> i32 {
        self.outcome.as_ref().map_or(1, RunOutcome::exit_code)
    }
}

/// Runs `source` to completion.
///
/// Transport signals and input lines are handled one at a time on the calling
/// task. Input is only read while the session is open, so piped input is not
/// consumed (and rejected) before the server is ready for it. `shutdown`
/// resolving stops the run from this side.
pub async fn drive_run<C, V, R, S>(
    connector: C,
    source: &str,
    console: V,
    input: R,
    shutdown: S,
) -> RunReport<V>
where
    C: Connector,
    V: Console,
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let (events_tx, mut events) = signal_channel();
    let mut controller = ExecutionController::with_connector(
        connector,
        events_tx,
        console,
        SourceAnnotator::new(source),
    );
    controller.run(source);

    let mut lines = input.lines();
    let mut input_open = true;
    let mut stopping = false;
    tokio::pin!(shutdown);

    while controller.is_running() {
        let accepting_input = input_open && controller.session_state() == SessionState::Open;
        tokio::select! {
            signal = events.recv() => match signal {
                Some(signal) => controller.handle_signal(signal),
                None => break,
            },
            line = lines.next_line(), if accepting_input => match line {
                Ok(Some(line)) => {
                    controller.submit_input(&line);
                }
                Ok(None) => {
                    debug!("input closed");
                    input_open = false;
                }
                Err(err) => {
                    warn!(error = %err, "failed to read input; no further input will be sent");
                    input_open = false;
                }
            },
            () = &mut shutdown, if !stopping => {
                stopping = true;
                controller.stop();
            }
        }
    }

    let (console, annotator, outcome) = controller.into_parts();
    RunReport {
        outcome,
        console,
        annotator,
    }
}
