//! Typed control-command namespace.
//!
//! One closed enum of command variants, each carrying its own typed
//! payload, dispatched by pattern matching. Get-commands answer through
//! [`CtrlValue`]. An adapter that does not understand a command returns
//! [`Error::Unsupported`](crate::Error::Unsupported) with no side effects.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    Connect,
}

impl Method {
    /// Wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

/// HTTP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// Cloneable callback invoked once per response header line.
///
/// Wrapped in an `Arc` so a get-command can hand back a clone of the
/// registered handler.
#[derive(Clone)]
pub struct HeaderHandler(Arc<dyn Fn(&str, &str) + Send + Sync>);

impl HeaderHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        HeaderHandler(Arc::new(f))
    }

    /// Invoke the handler with one header name/value pair.
    pub fn call(&self, name: &str, value: &str) {
        (self.0)(name, value)
    }
}

impl fmt::Debug for HeaderHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HeaderHandler")
    }
}

/// Control commands understood by stream adapters.
///
/// `GetSize` and `GetOffset` are answered from local stream state without a
/// transport round trip; the rest are forwarded to the transport binding's
/// option interface unmodified.
#[derive(Debug)]
pub enum Ctrl {
    /// Known content length, 0 meaning unknown. Requires an opened stream.
    GetSize,
    /// Current logical position, −1 meaning unknown. Requires an opened
    /// stream.
    GetOffset,
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
    /// Set one request header, replacing any previous value for the name.
    SetHeader(String, String),
    /// Get one request header by name.
    GetHeader(String),
    SetHeaderHandler(HeaderHandler),
    GetHeaderHandler,
    /// Byte range `[begin, end]`; `(0, 0)` means the whole resource.
    SetRange(u64, u64),
    GetRange,
    SetTls(bool),
    GetTls,
    SetTimeout(Duration),
    GetTimeout,
    /// Declared request-body size for uploads.
    SetPostSize(u64),
    GetPostSize,
    /// Transparent gzip/deflate decoding in the transport.
    SetAutoDecompress(bool),
    GetAutoDecompress,
    /// Maximum number of redirects to follow, 0 disabling redirects.
    SetRedirect(u32),
    GetRedirect,
    SetVersion(Version),
    GetVersion,
}

/// Typed answers to control commands. Set-commands answer [`Unit`].
///
/// [`Unit`]: CtrlValue::Unit
#[derive(Debug)]
pub enum CtrlValue {
    Unit,
    Size(u64),
    Offset(i64),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn method_wire_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Head.as_str(), "HEAD");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(Method::Connect.as_str(), "CONNECT");
    }

    #[test]
    fn header_handler_clones_share_target() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = hits.clone();
        let handler = HeaderHandler::new(move |name, value| {
            assert_eq!(name, "content-type");
            assert_eq!(value, "text/plain");
            counted.fetch_add(1, Ordering::Relaxed);
        });

        let clone = handler.clone();
        handler.call("content-type", "text/plain");
        clone.call("content-type", "text/plain");
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }
}
