use std::io;

use thiserror::Error;

/// Errors surfaced synchronously by stream operations and the dispatcher.
///
/// These cover precondition violations only. Asynchronous transport
/// failures travel through completion handlers as a
/// [`Status`](crate::Status), not through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport binding was released by `exit`; no further operations.
    #[error("stream transport released")]
    Exited,
    /// An operation is already outstanding on this stream.
    #[error("operation already in flight")]
    Busy,
    /// Size/offset queried before the open completion fired.
    #[error("stream not opened")]
    NotOpened,
    /// Write posted with no data.
    #[error("empty write")]
    EmptyWrite,
    /// A required command argument was empty or zero.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The adapter does not understand this control command.
    #[error("command not supported by this stream")]
    Unsupported,
    /// The transport refused to accept the request.
    #[error("transport rejected request: {0}")]
    Rejected(String),
    /// The dispatcher has shut down and accepts no more jobs.
    #[error("dispatcher is shut down")]
    Shutdown,
    /// Thread spawn or other OS-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
