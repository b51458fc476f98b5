//! Text framing for the execution session.
//!
//! Every frame travels as a single websocket text message: a literal kind
//! prefix followed by the raw payload. There is no escaping and no length
//! field. Internally frames are always handled as [`Frame`] values; the
//! prefix form only exists at the transport boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Run,
    Input,
    Output,
    Error,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Inbound prefixes in the order they are tried.
const SERVER_KINDS: [FrameKind; 3] = [FrameKind::Output, FrameKind::Error, FrameKind::Exit];
const CLIENT_KINDS: [FrameKind; 2] = [FrameKind::Run, FrameKind::Input];

impl FrameKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            FrameKind::Run => "RUN:",
            FrameKind::Input => "INPUT:",
            FrameKind::Output => "OUTPUT:",
            FrameKind::Error => "ERROR:",
            FrameKind::Exit => "EXIT:",
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            FrameKind::Run | FrameKind::Input => Direction::ClientToServer,
            FrameKind::Output | FrameKind::Error | FrameKind::Exit => Direction::ServerToClient,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Run => "run",
            FrameKind::Input => "input",
            FrameKind::Output => "output",
            FrameKind::Error => "error",
            FrameKind::Exit => "exit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("{kind:?} frames cannot be sent {direction:?}")]
    WrongDirection {
        kind: FrameKind,
        direction: Direction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: String,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn run(source: impl Into<String>) -> Self {
        Self::new(FrameKind::Run, source)
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Input, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Output, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Error, text)
    }

    pub fn exit(summary: impl Into<String>) -> Self {
        Self::new(FrameKind::Exit, summary)
    }

    /// Encodes the frame, refusing kinds that do not travel in `direction`.
    pub fn to_wire(&self, direction: Direction) -> Result<String, FrameError> {
        if self.kind.direction() != direction {
            return Err(FrameError::WrongDirection {
                kind: self.kind,
                direction,
            });
        }
        Ok(encode(self.kind, &self.payload))
    }
}

pub fn encode(kind: FrameKind, payload: &str) -> String {
    let prefix = kind.prefix();
    let mut wire = String::with_capacity(prefix.len() + payload.len());
    wire.push_str(prefix);
    wire.push_str(payload);
    wire
}

/// Decodes a message received from the execution server.
///
/// Returns `None` for anything that does not start with a known server
/// prefix; callers drop such messages without surfacing an error so newer
/// servers can add frame kinds.
pub fn decode_server(text: &str) -> Option<Frame> {
    decode_with(text, &SERVER_KINDS)
}

/// Decodes a message received from a client (`RUN:` / `INPUT:`).
pub fn decode_client(text: &str) -> Option<Frame> {
    decode_with(text, &CLIENT_KINDS)
}

fn decode_with(text: &str, kinds: &[FrameKind]) -> Option<Frame> {
    kinds.iter().find_map(|kind| {
        text.strip_prefix(kind.prefix())
            .map(|payload| Frame::new(*kind, payload))
    })
}
