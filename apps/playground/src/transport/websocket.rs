use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};
use url::Url;

use super::{
    ConnectionHandle, Connector, SessionId, SignalSender, TransportEvent, TransportSignal,
};
use crate::telemetry;

/// Connects sessions to the execution server over a websocket.
///
/// Must be used from within a Tokio runtime: each connection runs on its own
/// spawned task.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, session: SessionId, events: SignalSender) -> ConnectionHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let url = self.url.to_string();
        let task = tokio::spawn(async move {
            run_connection(url, session, outbound_rx, events).await;
        });
        ConnectionHandle::new(session, outbound_tx, Some(task))
    }
}

async fn run_connection(
    url: String,
    session: SessionId,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: SignalSender,
) {
    let emit = |event: TransportEvent| events.send(TransportSignal { session, event }).is_ok();

    debug!(target: "playground::transport", %session, %url, "connecting");
    // Nothing is queued before `Opened` is reported, so the queue only yields
    // here once the handle has been closed.
    let ws_stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(err) => {
                warn!(target: "playground::transport", %session, error = %err, "connect failed");
                emit(TransportEvent::Failed(err.to_string()));
                return;
            }
        },
        _ = outbound.recv() => {
            debug!(target: "playground::transport", %session, "connect abandoned");
            return;
        }
    };

    if !emit(TransportEvent::Opened) {
        return;
    }

    let (mut sink, mut stream) = ws_stream.split();
    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    trace!(
                        target: "playground::transport",
                        %session,
                        frame = %telemetry::preview(&text, 64),
                        "send"
                    );
                    if let Err(err) = sink.send(Message::Text(text)).await {
                        warn!(target: "playground::transport", %session, error = %err, "send failed");
                        emit(TransportEvent::Failed(err.to_string()));
                        return;
                    }
                }
                None => {
                    debug!(target: "playground::transport", %session, "closing");
                    let _ = sink.close().await;
                    return;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !emit(TransportEvent::Message(text)) {
                        return;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    if !emit(TransportEvent::Message(text)) {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "playground::transport", %session, ?frame, "peer closed");
                    emit(TransportEvent::Closed);
                    // Flushes the close reply tungstenite queued on receipt.
                    let _ = sink.close().await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(target: "playground::transport", %session, error = %err, "connection dropped");
                    emit(TransportEvent::Failed(err.to_string()));
                    return;
                }
                None => {
                    emit(TransportEvent::Closed);
                    return;
                }
            }
        }
    }
}
