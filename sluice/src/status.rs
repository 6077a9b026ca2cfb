/// Completion status delivered with every asynchronous outcome.
///
/// Adapters treat the status as opaque beyond [`Status::is_ok`]: the one
/// distinguished value drives position/size bookkeeping, everything else is
/// forwarded to the caller handler unmodified. Errors and end-of-stream are
/// reported through the same channel, never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation completed successfully.
    Ok,
    /// The stream reached end-of-stream or was closed in an orderly way.
    Closed,
    /// The operation was cancelled by `kill`.
    Killed,
    /// The transport gave up waiting.
    TimedOut,
    /// Any other transport-level failure.
    Failed,
}

impl Status {
    /// The single success sentinel.
    #[inline]
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}
