//! The state container contract consumed by the engine.
//!
//! The container owns queues, pending items, registered processors and
//! transaction records. The engine only talks to it through named queries
//! (`select`) and named actions (`dispatch`). Both may complete immediately
//! or after awaiting.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ItemId, QueuedItem, Transaction, TransactionId};
use crate::processor::ProcessorRef;

/// A read against container state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    GetProcessor { queue: String },
    GetTransaction { id: TransactionId },
    GetPendingItems { queue: String, context: String },
}

impl Query {
    /// Selector name, as exposed by the container.
    pub fn name(&self) -> &'static str {
        match self {
            Query::GetProcessor { .. } => "getProcessor",
            Query::GetTransaction { .. } => "getTransaction",
            Query::GetPendingItems { .. } => "getPendingItems",
        }
    }
}

/// Value returned by a [`Query`].
#[derive(Debug, Clone)]
pub enum Selection {
    Processor(Option<ProcessorRef>),
    Transaction(Option<Transaction>),
    PendingItems(Vec<QueuedItem>),
}

/// A mutation of container state.
#[derive(Debug, Clone)]
pub enum Action {
    RegisterProcessor {
        queue: String,
        processor: ProcessorRef,
    },
    EnqueueItem {
        queue: String,
        context: String,
        item: Value,
    },
    /// Chunk every pending item of the queue/context and run each chunk.
    Commit { queue: String, context: String },
}

impl Action {
    /// Action name, as exposed by the container.
    pub fn name(&self) -> &'static str {
        match self {
            Action::RegisterProcessor { .. } => "registerProcessor",
            Action::EnqueueItem { .. } => "enqueueItem",
            Action::Commit { .. } => "commit",
        }
    }
}

/// Value returned by an [`Action`].
#[derive(Debug, Clone)]
pub enum ActionOutput {
    Registered,
    Enqueued { item_id: ItemId },
    Committed(Transaction),
}

/// Query and mutation entry points of a state container.
pub trait Registry: Send + Sync {
    fn select(&self, query: Query) -> impl Future<Output = Result<Selection>> + Send;

    fn dispatch(&self, action: Action) -> impl Future<Output = Result<ActionOutput>> + Send;
}

impl<R: Registry> Registry for Arc<R> {
    fn select(&self, query: Query) -> impl Future<Output = Result<Selection>> + Send {
        (**self).select(query)
    }

    fn dispatch(&self, action: Action) -> impl Future<Output = Result<ActionOutput>> + Send {
        (**self).dispatch(action)
    }
}

impl Selection {
    pub fn into_processor(self) -> Result<Option<ProcessorRef>> {
        match self {
            Selection::Processor(processor) => Ok(processor),
            _ => Err(unexpected("getProcessor", "processor")),
        }
    }

    pub fn into_transaction(self) -> Result<Option<Transaction>> {
        match self {
            Selection::Transaction(transaction) => Ok(transaction),
            _ => Err(unexpected("getTransaction", "transaction")),
        }
    }

    pub fn into_pending_items(self) -> Result<Vec<QueuedItem>> {
        match self {
            Selection::PendingItems(items) => Ok(items),
            _ => Err(unexpected("getPendingItems", "pending items")),
        }
    }
}

impl ActionOutput {
    pub fn into_registered(self) -> Result<()> {
        match self {
            ActionOutput::Registered => Ok(()),
            _ => Err(unexpected("registerProcessor", "registration")),
        }
    }

    pub fn into_item_id(self) -> Result<ItemId> {
        match self {
            ActionOutput::Enqueued { item_id } => Ok(item_id),
            _ => Err(unexpected("enqueueItem", "item id")),
        }
    }

    pub fn into_transaction(self) -> Result<Transaction> {
        match self {
            ActionOutput::Committed(transaction) => Ok(transaction),
            _ => Err(unexpected("commit", "transaction")),
        }
    }
}

fn unexpected(effect: &'static str, expected: &'static str) -> Error {
    Error::UnexpectedOutput { effect, expected }
}
