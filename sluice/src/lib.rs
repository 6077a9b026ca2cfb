//! sluice — uniform asynchronous stream contract.
//!
//! sluice defines one non-blocking stream interface ([`AsyncStream`]) that
//! every stream adapter — file, socket, HTTP — implements identically.
//! Operations are posted and return immediately; outcomes arrive later on
//! worker threads through caller-supplied completion handlers carrying a
//! [`Status`]. Adapter-specific knobs are driven through a single typed
//! control-command namespace ([`Ctrl`] / [`CtrlValue`]).
//!
//! The crate also ships a compact worker-pool [`Dispatcher`] that transport
//! implementations use as their schedulable completion context: jobs posted
//! to it (optionally after a delay) run on named worker threads.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sluice::{AsyncStream, Ctrl, CtrlValue, Status};
//!
//! fn fetch(stream: &dyn AsyncStream) -> Result<(), sluice::Error> {
//!     stream.open(Box::new(|status: Status| {
//!         assert!(status.is_ok());
//!     }))?;
//!     // later, once the open completion fired:
//!     if let CtrlValue::Size(size) = stream.ctrl(Ctrl::GetSize)? {
//!         println!("content length: {size}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod ctrl;
pub mod dispatch;
pub mod error;
pub mod status;
pub mod stream;

/// Typed control-command namespace shared by all adapters.
pub use ctrl::Ctrl;
/// Typed answers returned by [`AsyncStream::ctrl`].
pub use ctrl::CtrlValue;
/// Cloneable response-header callback.
pub use ctrl::HeaderHandler;
/// HTTP request method selector.
pub use ctrl::Method;
/// HTTP protocol version selector.
pub use ctrl::Version;
/// Worker-pool completion dispatcher.
pub use dispatch::Dispatcher;
/// Errors surfaced synchronously by stream operations.
pub use error::Error;
/// Completion status delivered to every handler.
pub use status::Status;
/// The uniform asynchronous stream contract.
pub use stream::AsyncStream;
/// Open completion handler.
pub use stream::OpenHandler;
/// Read completion handler.
pub use stream::ReadHandler;
/// Seek completion handler.
pub use stream::SeekHandler;
/// Sync completion handler.
pub use stream::SyncHandler;
/// Task completion handler.
pub use stream::TaskHandler;
/// Write completion handler.
pub use stream::WriteHandler;
