//! HTTP stream adapter for the sluice async stream contract.
//!
//! [`HttpStream`] presents the uniform [`AsyncStream`](sluice::AsyncStream)
//! interface over an opaque asynchronous [`HttpTransport`] binding. The
//! adapter does protocol-agnostic bookkeeping only: it tracks the logical
//! stream position and total size while completions arrive out of order on
//! dispatcher worker threads, and it forwards control commands to the
//! transport's option interface. Connection management, redirects, chunked
//! and compressed decoding, and TLS all live behind the transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sluice::{AsyncStream, Ctrl, CtrlValue, Status};
//! use sluice_http::HttpStream;
//!
//! let transport: Arc<dyn sluice_http::HttpTransport> = make_transport();
//! let stream = HttpStream::with_endpoint(transport, "example.com", 443, "/data", true)?;
//!
//! let reader = stream.clone();
//! stream.open(Box::new(move |status: Status| {
//!     if status.is_ok() {
//!         // content length known once the open completion fired
//!         let size = reader.size().unwrap();
//!     }
//! }))?;
//! ```

pub mod metrics;
pub mod stream;
pub mod transport;

/// The HTTP stream adapter.
pub use stream::HttpStream;
/// The opaque asynchronous HTTP transport binding.
pub use transport::HttpTransport;
/// Transport option commands (the transport-side twin of `Ctrl`).
pub use transport::HttpOption;
/// Typed answers from the transport option interface.
pub use transport::OptionValue;
/// Response facts delivered with the open completion.
pub use transport::ResponseInfo;
/// Transport-level open completion callback.
pub use transport::TransportOpenFn;
/// Transport-level read completion callback.
pub use transport::TransportReadFn;
/// Transport-level write completion callback.
pub use transport::TransportWriteFn;
/// Transport-level seek completion callback.
pub use transport::TransportSeekFn;
/// Transport-level sync/task completion callback.
pub use transport::TransportDoneFn;
