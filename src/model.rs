//! Core data model.
//!
//! Items are opaque JSON payloads. A commit groups pending items into chunks
//! owned by a transaction, and the transaction collects each item's outcome.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier assigned to an item when it is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Identifier of one commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Position of a chunk within its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Items and chunks
// ---------------------------------------------------------------------------

/// An item together with the id it was enqueued under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub id: ItemId,
    /// Payload handed to the processor. Opaque to the engine.
    pub item: Value,
}

/// Ordered sub-batch of a transaction; the unit of processor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub items: Vec<QueuedItem>,
}

impl Chunk {
    /// Split the chunk into parallel id and payload sequences, keeping order.
    pub fn split(&self) -> (Vec<ItemId>, Vec<Value>) {
        self.items
            .iter()
            .map(|queued| (queued.id, queued.item.clone()))
            .unzip()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Errors reported by processors
// ---------------------------------------------------------------------------

/// Error attributed to a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ItemError {
    pub message: String,
    /// Structured details supplied by the processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ItemError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// How a processor call failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorFailure {
    /// One failure that applies to every item of the call.
    Single(ItemError),
    /// Failures positionally aligned with the items of the call.
    PerItem(Vec<ItemError>),
}

impl std::fmt::Display for ProcessorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorFailure::Single(error) => write!(f, "{error}"),
            ProcessorFailure::PerItem(errors) => write!(f, "{} item errors", errors.len()),
        }
    }
}

impl From<ItemError> for ProcessorFailure {
    fn from(error: ItemError) -> Self {
        ProcessorFailure::Single(error)
    }
}

impl From<Vec<ItemError>> for ProcessorFailure {
    fn from(errors: Vec<ItemError>) -> Self {
        ProcessorFailure::PerItem(errors)
    }
}

/// A failed chunk: the raw processor failure plus its per-item attribution.
#[derive(Debug, Clone, Error)]
#[error("chunk execution failed: {failure}")]
pub struct ChunkError {
    pub failure: ProcessorFailure,
    pub errors_by_id: HashMap<ItemId, ItemError>,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Chunks are still being processed.
    Pending,
    /// Every chunk ran without error.
    Committed,
    /// At least one chunk failed.
    Error,
}

impl TransactionState {
    pub fn can_transition_to(self, to: TransactionState) -> bool {
        matches!(
            (self, to),
            (TransactionState::Pending, TransactionState::Committed)
                | (TransactionState::Pending, TransactionState::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Error)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionState::Pending => "pending",
            TransactionState::Committed => "committed",
            TransactionState::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Record of one commit attempt for a queue and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub queue: String,
    pub context: String,
    pub state: TransactionState,
    pub chunks: BTreeMap<ChunkId, Chunk>,
    pub results: HashMap<ItemId, Value>,
    pub errors: HashMap<ItemId, ItemError>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Start a pending transaction with no chunks.
    pub fn new(queue: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            id: TransactionId::new(),
            queue: queue.into(),
            context: context.into(),
            state: TransactionState::Pending,
            chunks: BTreeMap::new(),
            results: HashMap::new(),
            errors: HashMap::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a chunk built from `items`, numbered after the existing ones.
    pub fn push_chunk(&mut self, items: Vec<QueuedItem>) -> ChunkId {
        let id = ChunkId(self.chunks.len() as u32);
        self.chunks.insert(id, Chunk { id, items });
        id
    }

    /// Number of items across all chunks.
    pub fn item_count(&self) -> usize {
        self.chunks.values().map(Chunk::len).sum()
    }

    /// Whether a result or an error is recorded for `id`.
    pub fn has_outcome(&self, id: ItemId) -> bool {
        self.results.contains_key(&id) || self.errors.contains_key(&id)
    }

    fn ensure_unrecorded(&self, id: ItemId) -> Result<()> {
        if self.has_outcome(id) {
            return Err(Error::OutcomeAlreadyRecorded(id));
        }
        Ok(())
    }

    pub fn record_result(&mut self, id: ItemId, result: Value) -> Result<()> {
        self.ensure_unrecorded(id)?;
        self.results.insert(id, result);
        Ok(())
    }

    pub fn record_error(&mut self, id: ItemId, error: ItemError) -> Result<()> {
        self.ensure_unrecorded(id)?;
        self.errors.insert(id, error);
        Ok(())
    }

    /// Move to `to`, stamping `completed_at` on terminal states.
    pub fn transition(&mut self, to: TransactionState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_cannot_be_overwritten() {
        let mut tx = Transaction::new("posts", "ctx");
        let id = ItemId::new();

        tx.record_result(id, json!(1)).unwrap();

        assert!(matches!(
            tx.record_result(id, json!(2)),
            Err(Error::OutcomeAlreadyRecorded(_))
        ));
        assert!(matches!(
            tx.record_error(id, ItemError::new("late")),
            Err(Error::OutcomeAlreadyRecorded(_))
        ));
        assert_eq!(tx.results[&id], json!(1));
        assert!(tx.errors.is_empty());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut tx = Transaction::new("posts", "ctx");
        tx.transition(TransactionState::Error).unwrap();
        assert!(tx.completed_at.is_some());

        let err = tx.transition(TransactionState::Committed).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: TransactionState::Error,
                to: TransactionState::Committed
            }
        ));
    }

    #[test]
    fn chunks_are_numbered_in_push_order() {
        let mut tx = Transaction::new("posts", "ctx");
        let first = tx.push_chunk(vec![QueuedItem {
            id: ItemId::new(),
            item: json!("a"),
        }]);
        let second = tx.push_chunk(vec![]);

        assert_eq!(first, ChunkId(0));
        assert_eq!(second, ChunkId(1));
        assert_eq!(tx.item_count(), 1);
    }

    #[test]
    fn transaction_survives_json_encoding() {
        let mut tx = Transaction::new("posts", "ctx");
        let ok = ItemId::new();
        let bad = ItemId::new();
        tx.push_chunk(vec![
            QueuedItem {
                id: ok,
                item: json!({"title": "a"}),
            },
            QueuedItem {
                id: bad,
                item: json!({"title": "b"}),
            },
        ]);
        tx.record_result(ok, json!("done")).unwrap();
        tx.record_error(bad, ItemError::new("rejected").with_data(json!({"code": 7})))
            .unwrap();
        tx.transition(TransactionState::Error).unwrap();

        let encoded = serde_json::to_value(&tx).unwrap();
        assert_eq!(encoded["state"], json!("error"));
        assert_eq!(encoded["queue"], json!("posts"));

        let decoded: Transaction =
            serde_json::from_str(&serde_json::to_string(&tx).unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.errors[&bad].data, Some(json!({"code": 7})));
    }
}
