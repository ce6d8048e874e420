//! Integration tests for telemetry initialization and span helpers.

use batchq::config::Config;
use batchq::model::{ChunkId, TransactionId, TransactionState};
use batchq::telemetry::batch::{
    record_transaction_id, record_transaction_state, start_chunk_span, start_commit_span,
};
use batchq::telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn telemetry_initializes_without_endpoint() {
    // Only one global subscriber can be set per process; a second init
    // returns Err, which is acceptable here.
    let config = TelemetryConfig::from_config(&Config::default());
    assert!(config.endpoint.is_none());
    assert_eq!(config.service_name, "batchq");

    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn commit_span_records_transaction() {
    let span = start_commit_span("posts", "ctx");
    record_transaction_id(&span, TransactionId::new());
    record_transaction_state(&span, TransactionState::Committed);
}

#[test]
fn chunk_span_creates() {
    let span = start_chunk_span("posts", TransactionId::new(), ChunkId(0), 3);
    span.in_scope(|| tracing::info!("inside chunk span"));
}
