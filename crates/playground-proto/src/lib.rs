//! Shared protocol definitions for the playground execution session.
//! Kept free of any runtime so the frame vocabulary and the diagnostic
//! line rules can be reused by clients, peers and test harnesses alike.

pub mod diagnostic;
pub mod exit;
pub mod frame;

pub use diagnostic::{Diagnostic, diagnostics, extract_lines};
pub use exit::ExitSummary;
pub use frame::{Direction, Frame, FrameError, FrameKind, decode_client, decode_server, encode};

/// Path the execution endpoint is served under.
pub const TERMINAL_PATH: &str = "/terminal";
