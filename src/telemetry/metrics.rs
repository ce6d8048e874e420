//! Metric instrument factories for batchq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"batchq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for batchq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("batchq")
}

/// Counter: items accepted into a queue.
/// Labels: `queue`.
pub fn items_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("batchq.items.enqueued")
        .with_description("Number of items enqueued")
        .build()
}

/// Counter: finished commits.
/// Labels: `queue`, `state` ("committed" | "error").
pub fn commits() -> Counter<u64> {
    meter()
        .u64_counter("batchq.commits")
        .with_description("Number of commits by terminal transaction state")
        .build()
}

/// Counter: processor invocations.
/// Labels: `queue`, `result` ("ok" | "error").
pub fn chunks_processed() -> Counter<u64> {
    meter()
        .u64_counter("batchq.chunks.processed")
        .with_description("Number of chunks run through a processor")
        .build()
}

/// Counter: items whose chunk failed.
/// Labels: `queue`.
pub fn items_failed() -> Counter<u64> {
    meter()
        .u64_counter("batchq.items.failed")
        .with_description("Number of items attributed a processor error")
        .build()
}

/// Histogram: processor call duration in milliseconds.
/// Labels: `queue`.
pub fn chunk_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("batchq.chunk.duration_ms")
        .with_description("Processor call duration in milliseconds")
        .with_unit("ms")
        .build()
}
