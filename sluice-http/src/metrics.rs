//! HTTP stream adapter metrics.
//!
//! Counters for posted operations, completions, and transferred bytes.
//! Readable through the metriken registry.

use metriken::{metric, Counter};

#[metric(
    name = "sluice/http/ops_posted",
    description = "Operations accepted for asynchronous execution"
)]
pub static OPS_POSTED: Counter = Counter::new();

#[metric(
    name = "sluice/http/ops_rejected",
    description = "Operations rejected synchronously (busy, exited, bad arguments)"
)]
pub static OPS_REJECTED: Counter = Counter::new();

#[metric(
    name = "sluice/http/completions",
    description = "Completions delivered to caller handlers"
)]
pub static COMPLETIONS: Counter = Counter::new();

#[metric(
    name = "sluice/http/streams_opened",
    description = "Open completions observed (any status)"
)]
pub static STREAMS_OPENED: Counter = Counter::new();

#[metric(
    name = "sluice/http/bytes_read",
    description = "Body bytes delivered by successful read completions"
)]
pub static BYTES_READ: Counter = Counter::new();

#[metric(
    name = "sluice/http/bytes_written",
    description = "Body bytes confirmed by successful write completions"
)]
pub static BYTES_WRITTEN: Counter = Counter::new();
