//! In-process connector for driving sessions without a network.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{
    ConnectionHandle, Connector, SessionId, SignalSender, TransportEvent, TransportSignal,
};

#[derive(Clone, Default)]
pub struct MockConnector {
    connections: Arc<Mutex<Vec<MockConnection>>>,
}

/// The far side of one mocked connection.
pub struct MockConnection {
    session: SessionId,
    outbound: mpsc::UnboundedReceiver<String>,
    events: SignalSender,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// Runs `f` against the `index`-th connection opened so far.
    pub fn with_connection<R>(&self, index: usize, f: impl FnOnce(&mut MockConnection) -> R) -> R {
        let mut connections = self.connections.lock().unwrap();
        let connection = connections
            .get_mut(index)
            .unwrap_or_else(|| panic!("no mock connection #{index}"));
        f(connection)
    }

    pub fn last<R>(&self, f: impl FnOnce(&mut MockConnection) -> R) -> R {
        let count = self.connection_count();
        assert!(count > 0, "no mock connection opened yet");
        self.with_connection(count - 1, f)
    }
}

impl Connector for MockConnector {
    fn connect(&self, session: SessionId, events: SignalSender) -> ConnectionHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.connections.lock().unwrap().push(MockConnection {
            session,
            outbound: outbound_rx,
            events,
        });
        ConnectionHandle::new(session, outbound_tx, None)
    }
}

impl MockConnection {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Wire text the client has sent so far.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            frames.push(text);
        }
        frames
    }

    /// True once the client side has closed or dropped its handle.
    pub fn client_closed(&mut self) -> bool {
        matches!(
            self.outbound.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        )
    }

    pub fn signal(&self, event: TransportEvent) -> TransportSignal {
        TransportSignal {
            session: self.session,
            event,
        }
    }

    /// Queues an event on the shared signal channel, as a transport task would.
    pub fn push(&self, event: TransportEvent) {
        let _ = self.events.send(self.signal(event));
    }

    pub fn open(&self) {
        self.push(TransportEvent::Opened);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.push(TransportEvent::Message(text.into()));
    }
}
