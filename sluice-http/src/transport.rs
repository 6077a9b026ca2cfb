//! The opaque asynchronous HTTP transport binding.
//!
//! All real work is delegated here: the adapter posts requests and the
//! transport invokes the supplied completion callback later, on a
//! dispatcher worker thread. The transport guarantees that completions for
//! the same binding never overlap in time (one outstanding operation per
//! binding), but a completion may run concurrently with `option` calls from
//! other threads.

use std::time::Duration;

use bytes::Bytes;
use sluice::ctrl::{HeaderHandler, Method, Version};
use sluice::{Error, Status};

/// Open completion: status plus the response facts the adapter reads.
pub type TransportOpenFn = Box<dyn FnOnce(Status, ResponseInfo) + Send>;

/// Read completion: status, data, bytes actually transferred, requested
/// maximum.
pub type TransportReadFn = Box<dyn FnOnce(Status, Bytes, usize, usize) + Send>;

/// Write completion: status, bytes actually written, requested size.
pub type TransportWriteFn = Box<dyn FnOnce(Status, usize, usize) + Send>;

/// Seek completion: status and the absolute offset the transport landed on.
pub type TransportSeekFn = Box<dyn FnOnce(Status, u64) + Send>;

/// Sync and task completion: status only.
pub type TransportDoneFn = Box<dyn FnOnce(Status) + Send>;

/// Response facts delivered with the open completion.
///
/// `gzip`/`deflate` mark a length-erasing transfer: the transport cannot
/// report a byte-exact content length up front, so `content_length` is
/// meaningless and the adapter records the size as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseInfo {
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Reported document length in bytes.
    pub content_length: u64,
    /// Body arrives gzip-compressed.
    pub gzip: bool,
    /// Body arrives deflate-compressed.
    pub deflate: bool,
}

impl ResponseInfo {
    /// Whether the transfer erases the content length.
    #[inline]
    pub fn length_erasing(&self) -> bool {
        self.gzip || self.deflate
    }
}

/// Transport option commands.
///
/// The transport-side twin of [`Ctrl`](sluice::Ctrl), minus the two
/// commands answered from adapter state (`GetSize`/`GetOffset`), which
/// never reach the transport.
#[derive(Debug)]
pub enum HttpOption {
    SetUrl(String),
    GetUrl,
    SetHost(String),
    GetHost,
    SetPort(u16),
    GetPort,
    SetPath(String),
    GetPath,
    SetMethod(Method),
    GetMethod,
    SetHeader(String, String),
    GetHeader(String),
    SetHeaderHandler(HeaderHandler),
    GetHeaderHandler,
    SetRange(u64, u64),
    GetRange,
    SetTls(bool),
    GetTls,
    SetTimeout(Duration),
    GetTimeout,
    SetPostSize(u64),
    GetPostSize,
    SetAutoDecompress(bool),
    GetAutoDecompress,
    SetRedirect(u32),
    GetRedirect,
    SetVersion(Version),
    GetVersion,
}

/// Typed answers from the transport option interface.
#[derive(Debug)]
pub enum OptionValue {
    Unit,
    Url(String),
    Host(String),
    Port(u16),
    Path(String),
    Method(Method),
    Header(Option<String>),
    HeaderHandler(Option<HeaderHandler>),
    Range(u64, u64),
    Tls(bool),
    Timeout(Duration),
    PostSize(u64),
    AutoDecompress(bool),
    Redirect(u32),
    Version(Version),
}

/// An active or pending asynchronous HTTP session.
///
/// Every posting method returns whether the request was *accepted for
/// asynchronous execution*; the outcome arrives later through the supplied
/// callback. `option` is synchronous and may be called concurrently with
/// an in-flight operation.
pub trait HttpTransport: Send + Sync {
    /// Post an open: resolve, connect, send the request, parse the
    /// response head. The callback receives the transport status and the
    /// response facts.
    fn open(&self, done: TransportOpenFn) -> Result<(), Error>;

    /// Post a read of at most `max` body bytes, after `delay`.
    fn read_after(&self, delay: Duration, max: usize, done: TransportReadFn)
        -> Result<(), Error>;

    /// Post a write of `data`, after `delay`.
    fn write_after(&self, delay: Duration, data: Bytes, done: TransportWriteFn)
        -> Result<(), Error>;

    /// Post a seek to the absolute position `offset`.
    fn seek(&self, offset: u64, done: TransportSeekFn) -> Result<(), Error>;

    /// Post a flush; `closing` hints that no further writes follow.
    fn sync(&self, closing: bool, done: TransportDoneFn) -> Result<(), Error>;

    /// Post a deferred no-I/O callback after `delay`.
    fn task_after(&self, delay: Duration, done: TransportDoneFn) -> Result<(), Error>;

    /// Cancel any in-flight operation. The pending callback still fires
    /// later with a non-success status.
    fn kill(&self);

    /// Dispose session resources. `calling` marks a close issued from
    /// within a completion callback.
    fn close(&self, calling: bool);

    /// Tear the session down entirely.
    fn exit(&self, calling: bool);

    /// Synchronous option accessor/mutator. The transport rejects
    /// semantically invalid values itself.
    fn option(&self, option: HttpOption) -> Result<OptionValue, Error>;
}
