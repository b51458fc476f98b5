use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use playground_client::console::TerminalConsole;
use playground_client::controller::{RunOutcome, CONNECTION_ERROR_NOTICE, RUN_BANNER};
use playground_client::runner::{drive_run, RunReport};
use playground_client::transport::WebSocketConnector;
use playground_proto::TERMINAL_PATH;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::fmt::SubscriberBuilder;
use url::Url;

const SOURCE: &str = "public class Main {\n    public static void main(String[] args) {\n        int x = 1\n    }\n}\n";

#[derive(Debug, Clone, Copy)]
enum Script {
    /// Reports a compile error on line 3 and exits with status 1.
    CompileError,
    /// Prompts for a name, greets whoever answers, exits with status 0.
    Greeter,
    /// Accepts the run and never answers.
    Silent,
    /// Closes the socket as soon as the run arrives.
    HangUp,
}

const CLOSE_ACKNOWLEDGED: &str = "<close acknowledged>";
const CLOSE_DROPPED: &str = "<close dropped>";

impl Script {
    fn reply(self, frame: &str) -> Vec<String> {
        match (self, frame) {
            (Script::CompileError, f) if f.starts_with("RUN:") => vec![
                "ERROR:Line 3: ';' expected".to_string(),
                "EXIT:1".to_string(),
            ],
            (Script::Greeter, f) if f.starts_with("RUN:") => {
                vec!["OUTPUT:Name? ".to_string()]
            }
            (Script::Greeter, f) => match f.strip_prefix("INPUT:") {
                Some(name) => vec![
                    format!("OUTPUT:Hello, {name}!\n"),
                    "EXIT:Program finished with exit code 0".to_string(),
                ],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

#[derive(Clone)]
struct Backend {
    script: Script,
    received: mpsc::UnboundedSender<String>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(backend): State<Backend>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, backend))
}

async fn handle_socket(mut socket: WebSocket, backend: Backend) {
    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let _ = backend.received.send(text.clone());
        if matches!(backend.script, Script::HangUp) {
            hang_up(socket, &backend).await;
            return;
        }
        for reply in backend.script.reply(&text) {
            if socket.send(WsMessage::Text(reply)).await.is_err() {
                return;
            }
        }
    }
}

async fn hang_up(mut socket: WebSocket, backend: &Backend) {
    if socket.send(WsMessage::Close(None)).await.is_err() {
        let _ = backend.received.send(CLOSE_DROPPED.to_string());
        return;
    }
    let marker = match socket.recv().await {
        Some(Ok(WsMessage::Close(_))) => CLOSE_ACKNOWLEDGED,
        _ => CLOSE_DROPPED,
    };
    let _ = backend.received.send(marker.to_string());
}

struct TestServer {
    url: Url,
    received: mpsc::UnboundedReceiver<String>,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start(script: Script) -> Self {
        let _ = SubscriberBuilder::default()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
        let (received_tx, received) = mpsc::unbounded_channel();
        let router = Router::new()
            .route(TERMINAL_PATH, get(ws_handler))
            .with_state(Backend {
                script,
                received: received_tx,
            });
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });
        let url = Url::parse(&format!("ws://{addr}{TERMINAL_PATH}")).expect("url");
        Self {
            url,
            received,
            _shutdown: shutdown_tx,
        }
    }

    async fn next_frame(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    fn frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.received.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

fn transcript(report: RunReport<TerminalConsole<Vec<u8>>>) -> String {
    String::from_utf8(report.console.into_inner()).expect("utf8 transcript")
}

fn plain_console() -> TerminalConsole<Vec<u8>> {
    TerminalConsole::new(Vec::new(), false)
}

#[test_timeout::tokio_timeout_test]
async fn compile_error_marks_the_offending_line() {
    let mut server = TestServer::start(Script::CompileError).await;

    let report = drive_run(
        WebSocketConnector::new(server.url.clone()),
        SOURCE,
        plain_console(),
        &b""[..],
        std::future::pending(),
    )
    .await;

    assert_eq!(report.exit_code(), 1);
    assert!(matches!(
        &report.outcome,
        Some(RunOutcome::Exited(summary)) if summary.code == Some(1)
    ));
    assert_eq!(report.annotator.marked_lines(), vec![2]);
    assert_eq!(
        report.annotator.render_gutter(),
        vec!["3 ●         int x = 1".to_string()]
    );

    let frames = server.frames();
    assert_eq!(frames.first().map(String::as_str), Some(format!("RUN:{SOURCE}").as_str()));
    assert_eq!(frames.iter().filter(|f| f.starts_with("RUN:")).count(), 1);

    let text = transcript(report);
    assert!(text.starts_with(RUN_BANNER));
    assert!(text.contains("Line 3: ';' expected"));
    assert!(text.trim_end().ends_with("=== 1 ==="));
}

#[test_timeout::tokio_timeout_test]
async fn piped_input_reaches_the_program() {
    let mut server = TestServer::start(Script::Greeter).await;

    let report = drive_run(
        WebSocketConnector::new(server.url.clone()),
        "class Greeter {}",
        plain_console(),
        &b"Alice\n"[..],
        std::future::pending(),
    )
    .await;

    assert_eq!(report.exit_code(), 0);
    assert!(report.annotator.marked_lines().is_empty());

    let frames = server.frames();
    assert_eq!(frames, vec!["RUN:class Greeter {}", "INPUT:Alice"]);

    let text = transcript(report);
    assert!(text.contains("Alice ↵"));
    assert!(text.contains("Hello, Alice!"));
    assert!(text.trim_end().ends_with("=== Program finished with exit code 0 ==="));
}

#[test_timeout::tokio_timeout_test]
async fn shutdown_stops_a_run_that_never_exits() {
    let mut server = TestServer::start(Script::Silent).await;

    let report = drive_run(
        WebSocketConnector::new(server.url.clone()),
        "loop {}",
        plain_console(),
        &b""[..],
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await;

    assert!(matches!(report.outcome, Some(RunOutcome::Stopped)));
    assert_eq!(report.exit_code(), 130);
    assert_eq!(server.frames(), vec!["RUN:loop {}"]);
}

#[test_timeout::tokio_timeout_test]
async fn server_close_is_acknowledged() {
    let mut server = TestServer::start(Script::HangUp).await;

    let report = drive_run(
        WebSocketConnector::new(server.url.clone()),
        "class Quit {}",
        plain_console(),
        &b""[..],
        std::future::pending(),
    )
    .await;

    assert!(matches!(report.outcome, Some(RunOutcome::Disconnected)));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(server.next_frame().await.as_deref(), Some("RUN:class Quit {}"));
    assert_eq!(server.next_frame().await.as_deref(), Some(CLOSE_ACKNOWLEDGED));
}

#[test_timeout::tokio_timeout_test]
async fn refused_connection_reports_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let url = Url::parse(&format!("ws://{addr}{TERMINAL_PATH}")).expect("url");

    let report = drive_run(
        WebSocketConnector::new(url),
        SOURCE,
        plain_console(),
        &b"ignored\n"[..],
        std::future::pending(),
    )
    .await;

    assert!(matches!(report.outcome, Some(RunOutcome::Failed(_))));
    assert_eq!(report.exit_code(), 1);
    let text = transcript(report);
    assert!(text.contains(CONNECTION_ERROR_NOTICE));
    assert!(!text.contains("ignored"));
}
