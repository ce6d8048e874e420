//! Span helpers for commits and chunk execution.

use tracing::Span;

use crate::model::{ChunkId, TransactionId, TransactionState};

/// Start a span covering one commit of a queue/context.
///
/// `batch.transaction.id` and `batch.transaction.state` are declared empty
/// and filled once the transaction exists and settles.
pub fn start_commit_span(queue: &str, context: &str) -> Span {
    tracing::info_span!(
        "batch.commit",
        "batch.queue" = queue,
        "batch.context" = context,
        "batch.transaction.id" = tracing::field::Empty,
        "batch.transaction.state" = tracing::field::Empty,
    )
}

/// Attach the transaction id to a commit span.
pub fn record_transaction_id(span: &Span, id: TransactionId) {
    span.record("batch.transaction.id", tracing::field::display(id));
}

/// Record the terminal state of a commit and emit a state event in its scope.
pub fn record_transaction_state(span: &Span, state: TransactionState) {
    span.record("batch.transaction.state", tracing::field::display(state));
    span.in_scope(|| {
        tracing::info!(state = %state, "transaction settled");
    });
}

/// Start a span for one processor invocation.
pub fn start_chunk_span(queue: &str, transaction: TransactionId, chunk: ChunkId, size: usize) -> Span {
    tracing::info_span!(
        "batch.chunk",
        "batch.queue" = queue,
        "batch.transaction.id" = %transaction,
        "batch.chunk.id" = %chunk,
        "batch.chunk.size" = size,
    )
}
