//! Error types for batchq.

use thiserror::Error;

use crate::model::{ChunkError, ChunkId, ItemError, ItemId, TransactionId, TransactionState};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "There is no batch processor registered for \"{queue}\" queue. \
         Register one by dispatching the processor-registration action on the batch-processing store."
    )]
    ProcessorNotRegistered { queue: String },

    /// A whole chunk failed. Carries per-item attribution for transaction bookkeeping.
    #[error(transparent)]
    ChunkExecution(#[from] ChunkError),

    /// The caller's own item failed.
    #[error(transparent)]
    Item(#[from] ItemError),

    #[error("chunk {chunk_id} not found in transaction {transaction_id}")]
    ChunkNotFound {
        transaction_id: TransactionId,
        chunk_id: ChunkId,
    },

    #[error("no outcome recorded for item {0}")]
    MissingOutcome(ItemId),

    #[error("outcome already recorded for item {0}")]
    OutcomeAlreadyRecorded(ItemId),

    #[error("invalid transaction state transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionState,
        to: TransactionState,
    },

    #[error("unexpected output from {effect}: expected {expected}")]
    UnexpectedOutput {
        effect: &'static str,
        expected: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
