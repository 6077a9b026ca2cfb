//! The HTTP stream adapter.
//!
//! [`HttpStream`] keeps three pieces of shared state — the opened flag, the
//! known content length, and the logical position — in lock-free atomics,
//! because a completion running on a dispatcher worker may overlap a
//! control-command call from any other thread. Exactly one operation may be
//! outstanding at a time; the single pending-handler slot enforces that by
//! rejecting a second post with [`Error::Busy`].

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use sluice::ctrl::{Ctrl, CtrlValue};
use sluice::stream::{
    AsyncStream, OpenHandler, ReadHandler, SeekHandler, SyncHandler, TaskHandler, WriteHandler,
};
use sluice::{Error, Status};

use crate::metrics;
use crate::transport::{HttpOption, HttpTransport, OptionValue, ResponseInfo};

/// Offset sentinel: position unknown / not tracked.
const OFFSET_UNKNOWN: i64 = -1;

/// The caller's continuation for the single in-flight operation, tagged
/// with the operation kind. The dispatcher sets the tag; the matching
/// trampoline asserts it before invoking.
enum Pending {
    Open(OpenHandler),
    Read(ReadHandler),
    Write(WriteHandler),
    Seek(SeekHandler),
    Sync(SyncHandler),
    Task(TaskHandler),
}

struct StreamInner {
    /// Set exactly once, by the open trampoline, on any open status.
    opened: AtomicBool,
    /// Known content length; 0 = unknown (length-erasing transfer).
    size: AtomicU64,
    /// Logical position; −1 = unknown.
    offset: AtomicI64,
    /// Single pending-handler slot shared across all operation kinds.
    pending: Mutex<Option<Pending>>,
    /// The transport binding; `exit` takes it out.
    transport: Mutex<Option<Arc<dyn HttpTransport>>>,
}

/// Uniform asynchronous stream over an opaque HTTP transport.
///
/// Cheap to clone; clones share the same stream state and transport
/// binding, so a completion handler can capture a clone and post the next
/// operation from inside the callback.
#[derive(Clone)]
pub struct HttpStream {
    inner: Arc<StreamInner>,
}

impl HttpStream {
    /// Wrap a transport binding in an unopened stream.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        HttpStream {
            inner: Arc::new(StreamInner {
                opened: AtomicBool::new(false),
                size: AtomicU64::new(0),
                offset: AtomicI64::new(OFFSET_UNKNOWN),
                pending: Mutex::new(None),
                transport: Mutex::new(Some(transport)),
            }),
        }
    }

    /// Wrap a transport binding and configure host, port, path, and TLS
    /// before returning the unopened stream. `host` and `path` must be
    /// non-empty and `port` non-zero.
    pub fn with_endpoint(
        transport: Arc<dyn HttpTransport>,
        host: &str,
        port: u16,
        path: &str,
        tls: bool,
    ) -> Result<Self, Error> {
        let stream = HttpStream::new(transport);
        stream.ctrl(Ctrl::SetHost(host.to_string()))?;
        stream.ctrl(Ctrl::SetPort(port))?;
        stream.ctrl(Ctrl::SetPath(path.to_string()))?;
        stream.ctrl(Ctrl::SetTls(tls))?;
        Ok(stream)
    }

    /// Known content length, answered from local state. 0 = unknown.
    /// Fails until the open completion has fired.
    pub fn size(&self) -> Result<u64, Error> {
        self.ensure_transport()?;
        if !self.inner.opened.load(Ordering::Acquire) {
            return Err(Error::NotOpened);
        }
        Ok(self.inner.size.load(Ordering::Acquire))
    }

    /// Current logical position, answered from local state. −1 = unknown.
    /// Fails until the open completion has fired.
    pub fn offset(&self) -> Result<i64, Error> {
        self.ensure_transport()?;
        if !self.inner.opened.load(Ordering::Acquire) {
            return Err(Error::NotOpened);
        }
        Ok(self.inner.offset.load(Ordering::Acquire))
    }

    fn ensure_transport(&self) -> Result<(), Error> {
        if self.lock_transport().is_some() {
            Ok(())
        } else {
            Err(Error::Exited)
        }
    }

    fn transport(&self) -> Result<Arc<dyn HttpTransport>, Error> {
        self.lock_transport().clone().ok_or(Error::Exited)
    }

    fn lock_transport(
        &self,
    ) -> std::sync::MutexGuard<'_, Option<Arc<dyn HttpTransport>>> {
        self.inner
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the continuation for a new operation. Fails with `Busy` if
    /// one is already outstanding.
    fn install(&self, pending: Pending) -> Result<(), Error> {
        let mut slot = self.inner.lock_pending();
        if slot.is_some() {
            metrics::OPS_REJECTED.increment();
            return Err(Error::Busy);
        }
        *slot = Some(pending);
        Ok(())
    }

    /// Account for the post outcome. A transport that refuses the post
    /// gets its freshly installed slot cleared again, so a synchronous
    /// rejection never wedges the stream.
    fn posted(&self, result: Result<(), Error>) -> Result<(), Error> {
        match result {
            Ok(()) => {
                metrics::OPS_POSTED.increment();
                Ok(())
            }
            Err(e) => {
                metrics::OPS_REJECTED.increment();
                *self.inner.lock_pending() = None;
                Err(e)
            }
        }
    }
}

impl StreamInner {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(&self) -> Option<Pending> {
        self.lock_pending().take()
    }

    /// Resolve a trampoline's weak handle. A completion firing after
    /// teardown is an internal-consistency defect, not a caller error.
    fn live(state: &Weak<StreamInner>) -> Option<Arc<StreamInner>> {
        let inner = state.upgrade();
        debug_assert!(inner.is_some(), "completion fired after stream teardown");
        inner
    }

    /// Advance the logical position by `real` transferred bytes. The
    /// fetch-and-add is meaningless when the pre-advance value was the
    /// unknown sentinel, so that case forces the sentinel back in place.
    fn advance(&self, real: usize) {
        let prev = self.offset.fetch_add(real as i64, Ordering::AcqRel);
        if prev < 0 {
            self.offset.store(OFFSET_UNKNOWN, Ordering::Release);
        }
    }

    fn on_open(state: &Weak<StreamInner>, status: Status, info: ResponseInfo) {
        let Some(inner) = Self::live(state) else { return };

        // Opened on any status; callers must check the completion status.
        inner.opened.store(true, Ordering::Release);
        metrics::STREAMS_OPENED.increment();

        let size = if info.length_erasing() {
            0
        } else {
            info.content_length
        };
        inner.size.store(size, Ordering::Release);
        if size != 0 {
            inner.offset.store(0, Ordering::Release);
        }

        match inner.take_pending() {
            Some(Pending::Open(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status);
            }
            _ => debug_assert!(false, "open completion without a pending open"),
        }
    }

    fn on_read(
        state: &Weak<StreamInner>,
        status: Status,
        data: Bytes,
        real: usize,
        requested: usize,
    ) {
        let Some(inner) = Self::live(state) else { return };

        if status.is_ok() {
            inner.advance(real);
            metrics::BYTES_READ.add(real as u64);
        }

        match inner.take_pending() {
            Some(Pending::Read(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status, data, real, requested);
            }
            _ => debug_assert!(false, "read completion without a pending read"),
        }
    }

    fn on_write(state: &Weak<StreamInner>, status: Status, real: usize, requested: usize) {
        let Some(inner) = Self::live(state) else { return };

        if status.is_ok() {
            inner.advance(real);
            metrics::BYTES_WRITTEN.add(real as u64);
        }

        match inner.take_pending() {
            Some(Pending::Write(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status, real, requested);
            }
            _ => debug_assert!(false, "write completion without a pending write"),
        }
    }

    fn on_seek(state: &Weak<StreamInner>, status: Status, offset: u64) {
        let Some(inner) = Self::live(state) else { return };

        // Absolute overwrite on success; untouched on failure. An offset
        // beyond the i64 range cannot be represented without colliding
        // with the sentinel domain, so it is left untouched too.
        if status.is_ok() {
            if let Ok(landed) = i64::try_from(offset) {
                inner.offset.store(landed, Ordering::Release);
            }
        }

        match inner.take_pending() {
            Some(Pending::Seek(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status, offset);
            }
            _ => debug_assert!(false, "seek completion without a pending seek"),
        }
    }

    fn on_sync(state: &Weak<StreamInner>, status: Status) {
        let Some(inner) = Self::live(state) else { return };
        match inner.take_pending() {
            Some(Pending::Sync(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status);
            }
            _ => debug_assert!(false, "sync completion without a pending sync"),
        }
    }

    fn on_task(state: &Weak<StreamInner>, status: Status) {
        let Some(inner) = Self::live(state) else { return };
        match inner.take_pending() {
            Some(Pending::Task(handler)) => {
                metrics::COMPLETIONS.increment();
                handler(status);
            }
            _ => debug_assert!(false, "task completion without a pending task"),
        }
    }
}

impl AsyncStream for HttpStream {
    fn open(&self, handler: OpenHandler) -> Result<(), Error> {
        let transport = self.transport()?;
        self.install(Pending::Open(handler))?;

        self.inner.size.store(0, Ordering::Release);
        self.inner.offset.store(OFFSET_UNKNOWN, Ordering::Release);

        let state = Arc::downgrade(&self.inner);
        let result = transport.open(Box::new(move |status, info| {
            StreamInner::on_open(&state, status, info);
        }));
        self.posted(result)
    }

    fn read(&self, delay: Duration, max: usize, handler: ReadHandler) -> Result<(), Error> {
        let transport = self.transport()?;
        self.install(Pending::Read(handler))?;

        let state = Arc::downgrade(&self.inner);
        let result = transport.read_after(
            delay,
            max,
            Box::new(move |status, data, real, requested| {
                StreamInner::on_read(&state, status, data, real, requested);
            }),
        );
        self.posted(result)
    }

    fn write(&self, delay: Duration, data: Bytes, handler: WriteHandler) -> Result<(), Error> {
        if data.is_empty() {
            metrics::OPS_REJECTED.increment();
            return Err(Error::EmptyWrite);
        }
        let transport = self.transport()?;
        self.install(Pending::Write(handler))?;

        let state = Arc::downgrade(&self.inner);
        let result = transport.write_after(
            delay,
            data,
            Box::new(move |status, real, requested| {
                StreamInner::on_write(&state, status, real, requested);
            }),
        );
        self.posted(result)
    }

    fn seek(&self, offset: u64, handler: SeekHandler) -> Result<(), Error> {
        let transport = self.transport()?;
        self.install(Pending::Seek(handler))?;

        let state = Arc::downgrade(&self.inner);
        let result = transport.seek(
            offset,
            Box::new(move |status, landed| {
                StreamInner::on_seek(&state, status, landed);
            }),
        );
        self.posted(result)
    }

    fn sync(&self, closing: bool, handler: SyncHandler) -> Result<(), Error> {
        let transport = self.transport()?;
        self.install(Pending::Sync(handler))?;

        let state = Arc::downgrade(&self.inner);
        let result = transport.sync(
            closing,
            Box::new(move |status| {
                StreamInner::on_sync(&state, status);
            }),
        );
        self.posted(result)
    }

    fn task(&self, delay: Duration, handler: TaskHandler) -> Result<(), Error> {
        let transport = self.transport()?;
        self.install(Pending::Task(handler))?;

        let state = Arc::downgrade(&self.inner);
        let result = transport.task_after(
            delay,
            Box::new(move |status| {
                StreamInner::on_task(&state, status);
            }),
        );
        self.posted(result)
    }

    fn kill(&self) {
        // Drop the transport guard before the call: the transport may fire
        // the pending completion synchronously, and that handler may lock
        // the transport again from this thread.
        let transport = self.lock_transport().clone();
        if let Some(transport) = transport {
            transport.kill();
        }
    }

    fn close(&self, calling: bool) {
        let transport = self.lock_transport().clone();
        if let Some(transport) = transport {
            transport.close(calling);
        }
        // Size and offset reset unconditionally, even without a binding.
        self.inner.size.store(0, Ordering::Release);
        self.inner.offset.store(OFFSET_UNKNOWN, Ordering::Release);
    }

    fn exit(&self, calling: bool) {
        let taken = self.lock_transport().take();
        if let Some(transport) = taken {
            transport.exit(calling);
        }
    }

    fn ctrl(&self, ctrl: Ctrl) -> Result<CtrlValue, Error> {
        let transport = self.transport()?;

        let option = match ctrl {
            Ctrl::GetSize => return self.size().map(CtrlValue::Size),
            Ctrl::GetOffset => return self.offset().map(CtrlValue::Offset),
            Ctrl::SetUrl(url) => {
                require_text("url", &url)?;
                HttpOption::SetUrl(url)
            }
            Ctrl::GetUrl => HttpOption::GetUrl,
            Ctrl::SetHost(host) => {
                require_text("host", &host)?;
                HttpOption::SetHost(host)
            }
            Ctrl::GetHost => HttpOption::GetHost,
            Ctrl::SetPort(port) => {
                if port == 0 {
                    return Err(Error::InvalidArgument("port"));
                }
                HttpOption::SetPort(port)
            }
            Ctrl::GetPort => HttpOption::GetPort,
            Ctrl::SetPath(path) => {
                require_text("path", &path)?;
                HttpOption::SetPath(path)
            }
            Ctrl::GetPath => HttpOption::GetPath,
            Ctrl::SetMethod(method) => HttpOption::SetMethod(method),
            Ctrl::GetMethod => HttpOption::GetMethod,
            Ctrl::SetHeader(name, value) => {
                require_text("header name", &name)?;
                HttpOption::SetHeader(name, value)
            }
            Ctrl::GetHeader(name) => {
                require_text("header name", &name)?;
                HttpOption::GetHeader(name)
            }
            Ctrl::SetHeaderHandler(handler) => HttpOption::SetHeaderHandler(handler),
            Ctrl::GetHeaderHandler => HttpOption::GetHeaderHandler,
            Ctrl::SetRange(begin, end) => HttpOption::SetRange(begin, end),
            Ctrl::GetRange => HttpOption::GetRange,
            Ctrl::SetTls(tls) => HttpOption::SetTls(tls),
            Ctrl::GetTls => HttpOption::GetTls,
            Ctrl::SetTimeout(timeout) => {
                if timeout.is_zero() {
                    return Err(Error::InvalidArgument("timeout"));
                }
                HttpOption::SetTimeout(timeout)
            }
            Ctrl::GetTimeout => HttpOption::GetTimeout,
            Ctrl::SetPostSize(size) => HttpOption::SetPostSize(size),
            Ctrl::GetPostSize => HttpOption::GetPostSize,
            Ctrl::SetAutoDecompress(on) => HttpOption::SetAutoDecompress(on),
            Ctrl::GetAutoDecompress => HttpOption::GetAutoDecompress,
            Ctrl::SetRedirect(limit) => HttpOption::SetRedirect(limit),
            Ctrl::GetRedirect => HttpOption::GetRedirect,
            Ctrl::SetVersion(version) => HttpOption::SetVersion(version),
            Ctrl::GetVersion => HttpOption::GetVersion,
        };

        transport.option(option).map(answer)
    }
}

fn require_text(what: &'static str, text: &str) -> Result<(), Error> {
    if text.is_empty() {
        Err(Error::InvalidArgument(what))
    } else {
        Ok(())
    }
}

/// Lift a transport option answer into the stream-level answer type.
fn answer(value: OptionValue) -> CtrlValue {
    match value {
        OptionValue::Unit => CtrlValue::Unit,
        OptionValue::Url(url) => CtrlValue::Url(url),
        OptionValue::Host(host) => CtrlValue::Host(host),
        OptionValue::Port(port) => CtrlValue::Port(port),
        OptionValue::Path(path) => CtrlValue::Path(path),
        OptionValue::Method(method) => CtrlValue::Method(method),
        OptionValue::Header(header) => CtrlValue::Header(header),
        OptionValue::HeaderHandler(handler) => CtrlValue::HeaderHandler(handler),
        OptionValue::Range(begin, end) => CtrlValue::Range(begin, end),
        OptionValue::Tls(tls) => CtrlValue::Tls(tls),
        OptionValue::Timeout(timeout) => CtrlValue::Timeout(timeout),
        OptionValue::PostSize(size) => CtrlValue::PostSize(size),
        OptionValue::AutoDecompress(on) => CtrlValue::AutoDecompress(on),
        OptionValue::Redirect(limit) => CtrlValue::Redirect(limit),
        OptionValue::Version(version) => CtrlValue::Version(version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner() -> Arc<StreamInner> {
        Arc::new(StreamInner {
            opened: AtomicBool::new(false),
            size: AtomicU64::new(0),
            offset: AtomicI64::new(OFFSET_UNKNOWN),
            pending: Mutex::new(None),
            transport: Mutex::new(None),
        })
    }

    #[test]
    fn advance_from_known_position_adds() {
        let state = inner();
        state.offset.store(100, Ordering::Release);
        state.advance(50);
        assert_eq!(state.offset.load(Ordering::Acquire), 150);
    }

    #[test]
    fn advance_from_sentinel_recovers_sentinel() {
        let state = inner();
        state.advance(200);
        assert_eq!(state.offset.load(Ordering::Acquire), OFFSET_UNKNOWN);
    }

    #[test]
    fn open_completion_with_plain_length_sets_size_and_offset() {
        let state = inner();
        *state.lock_pending() = Some(Pending::Open(Box::new(|_| {})));
        let info = ResponseInfo {
            status_code: 200,
            content_length: 1000,
            ..Default::default()
        };
        StreamInner::on_open(&Arc::downgrade(&state), Status::Ok, info);

        assert!(state.opened.load(Ordering::Acquire));
        assert_eq!(state.size.load(Ordering::Acquire), 1000);
        assert_eq!(state.offset.load(Ordering::Acquire), 0);
    }

    #[test]
    fn open_completion_with_length_erasing_transfer_leaves_sentinel() {
        let state = inner();
        *state.lock_pending() = Some(Pending::Open(Box::new(|_| {})));
        let info = ResponseInfo {
            status_code: 200,
            content_length: 1000,
            gzip: true,
            ..Default::default()
        };
        StreamInner::on_open(&Arc::downgrade(&state), Status::Ok, info);

        assert!(state.opened.load(Ordering::Acquire));
        assert_eq!(state.size.load(Ordering::Acquire), 0);
        assert_eq!(state.offset.load(Ordering::Acquire), OFFSET_UNKNOWN);
    }

    #[test]
    fn failed_read_leaves_offset_untouched() {
        let state = inner();
        state.offset.store(300, Ordering::Release);
        *state.lock_pending() = Some(Pending::Read(Box::new(|status, _, _, _| {
            assert_eq!(status, Status::Failed);
        })));
        StreamInner::on_read(
            &Arc::downgrade(&state),
            Status::Failed,
            Bytes::new(),
            0,
            512,
        );
        assert_eq!(state.offset.load(Ordering::Acquire), 300);
    }

    #[test]
    fn failed_seek_leaves_offset_untouched() {
        let state = inner();
        state.offset.store(300, Ordering::Release);
        *state.lock_pending() = Some(Pending::Seek(Box::new(|_, _| {})));
        StreamInner::on_seek(&Arc::downgrade(&state), Status::Failed, 900);
        assert_eq!(state.offset.load(Ordering::Acquire), 300);
    }

    #[test]
    fn unrepresentable_seek_offset_leaves_position_untouched() {
        let state = inner();
        state.offset.store(300, Ordering::Release);
        *state.lock_pending() = Some(Pending::Seek(Box::new(|status, _| {
            assert!(status.is_ok());
        })));
        StreamInner::on_seek(&Arc::downgrade(&state), Status::Ok, u64::MAX);
        assert_eq!(state.offset.load(Ordering::Acquire), 300);
    }
}
