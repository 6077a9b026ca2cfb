//! The uniform asynchronous stream contract.
//!
//! Every adapter exposes the same operation set: post an operation with a
//! completion handler, get back `Ok(())` meaning *accepted for asynchronous
//! execution* — not success. The outcome arrives later, on a dispatcher
//! worker thread, through the handler. At most one operation may be
//! outstanding per stream; posting a second one fails with
//! [`Error::Busy`](crate::Error::Busy).

use std::time::Duration;

use bytes::Bytes;

use crate::ctrl::{Ctrl, CtrlValue};
use crate::error::Error;
use crate::status::Status;

/// Handler for an open completion. Receives the transport status.
///
/// Note that a stream is marked opened on *any* open completion, including
/// failed ones; the status is the only reliable success signal.
pub type OpenHandler = Box<dyn FnOnce(Status) + Send>;

/// Handler for a read completion: status, received data, bytes actually
/// transferred, and the requested maximum.
pub type ReadHandler = Box<dyn FnOnce(Status, Bytes, usize, usize) + Send>;

/// Handler for a write completion: status, bytes actually written, and the
/// requested size.
pub type WriteHandler = Box<dyn FnOnce(Status, usize, usize) + Send>;

/// Handler for a seek completion: status and the (possibly unchanged)
/// absolute offset.
pub type SeekHandler = Box<dyn FnOnce(Status, u64) + Send>;

/// Handler for a sync completion.
pub type SyncHandler = Box<dyn FnOnce(Status) + Send>;

/// Handler for a deferred-task completion.
pub type TaskHandler = Box<dyn FnOnce(Status) + Send>;

/// One non-blocking stream interface over any transport.
///
/// All posting methods return immediately; none of them blocks the calling
/// thread. Completion handlers may themselves post new operations — no lock
/// is held across a handler invocation.
pub trait AsyncStream: Send + Sync {
    /// Post an open. Resets tracked size and offset before posting.
    fn open(&self, handler: OpenHandler) -> Result<(), Error>;

    /// Post a read of at most `max` bytes, optionally delayed.
    fn read(&self, delay: Duration, max: usize, handler: ReadHandler) -> Result<(), Error>;

    /// Post a write of `data`, optionally delayed. `data` must be non-empty.
    fn write(&self, delay: Duration, data: Bytes, handler: WriteHandler) -> Result<(), Error>;

    /// Post a seek to the absolute position `offset`.
    fn seek(&self, offset: u64, handler: SeekHandler) -> Result<(), Error>;

    /// Post a flush. `closing` hints the transport that no further writes
    /// follow.
    fn sync(&self, closing: bool, handler: SyncHandler) -> Result<(), Error>;

    /// Post a deferred no-I/O callback, e.g. for periodic keepalive work.
    fn task(&self, delay: Duration, handler: TaskHandler) -> Result<(), Error>;

    /// Request cancellation of any in-flight operation. Fire-and-forget:
    /// the pending handler still fires later with a non-success status.
    fn kill(&self);

    /// Dispose transport-level session resources and reset tracked size and
    /// offset. `calling` indicates the close happens from within a
    /// completion handler, so the transport can avoid reentrant teardown.
    fn close(&self, calling: bool);

    /// Release the transport binding entirely. No operation may be posted
    /// afterward, and none may be outstanding when this is called.
    fn exit(&self, calling: bool);

    /// Execute a control command. `GetSize`/`GetOffset` are answered from
    /// local stream state; everything else is forwarded to the transport.
    fn ctrl(&self, ctrl: Ctrl) -> Result<CtrlValue, Error>;
}
