//! In-memory state container.
//!
//! Holds registered processors, pending items per queue/context and
//! transaction records. A commit drains the pending items of one
//! queue/context, splits them into chunks and runs each chunk in order.
//! Nothing is persisted.

use std::collections::HashMap;

use opentelemetry::KeyValue;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{Instrument, Span, debug, info};

use crate::config::{Config, DEFAULT_MAX_CHUNK_SIZE, QueueConfig};
use crate::engine::chunk::process_chunk;
use crate::error::{Error, Result};
use crate::model::{ChunkId, ItemId, QueuedItem, Transaction, TransactionId, TransactionState};
use crate::processor::ProcessorRef;
use crate::registry::{Action, ActionOutput, Query, Registry, Selection};
use crate::telemetry::batch::{record_transaction_id, record_transaction_state, start_commit_span};
use crate::telemetry::metrics;

#[derive(Default)]
struct StoreState {
    processors: HashMap<String, ProcessorRef>,
    /// Pending items keyed by (queue, context), in enqueue order.
    pending: HashMap<(String, String), Vec<QueuedItem>>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// State container kept entirely in memory.
pub struct MemoryStore {
    state: Mutex<StoreState>,
    max_chunk_size: usize,
    queues: QueueConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    /// A store that hands at most `max_chunk_size` items to a processor at once.
    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            max_chunk_size: max_chunk_size.max(1),
            queues: QueueConfig::default(),
        }
    }

    /// A store using the configured default chunk size and per-queue overrides.
    pub fn from_config(config: &Config, queues: QueueConfig) -> Self {
        Self {
            queues,
            ..Self::with_max_chunk_size(config.max_chunk_size)
        }
    }

    /// Chunk size in effect for `queue`.
    pub fn max_chunk_size(&self, queue: &str) -> usize {
        self.queues
            .max_chunk_size(queue, self.max_chunk_size)
            .max(1)
    }

    async fn save(&self, transaction: &Transaction) {
        self.state
            .lock()
            .await
            .transactions
            .insert(transaction.id, transaction.clone());
    }

    async fn enqueue(&self, queue: String, context: String, item: Value) -> ItemId {
        let id = ItemId::new();
        metrics::items_enqueued().add(1, &[KeyValue::new("queue", queue.clone())]);
        debug!(%queue, %context, item_id = %id, "item enqueued");

        self.state
            .lock()
            .await
            .pending
            .entry((queue, context))
            .or_default()
            .push(QueuedItem { id, item });
        id
    }

    /// Drain the pending items of `queue`/`context` into a new pending transaction.
    ///
    /// Items stay pending when the queue has no processor to run them.
    async fn open_transaction(&self, queue: &str, context: &str) -> Result<Transaction> {
        let mut transaction = Transaction::new(queue, context);
        let size = self.max_chunk_size(queue);
        let key = (queue.to_string(), context.to_string());

        let mut state = self.state.lock().await;
        let has_pending = state.pending.get(&key).is_some_and(|items| !items.is_empty());
        if has_pending && !state.processors.contains_key(queue) {
            return Err(Error::ProcessorNotRegistered {
                queue: queue.to_string(),
            });
        }

        let mut items = state.pending.remove(&key).unwrap_or_default();
        while !items.is_empty() {
            let rest = items.split_off(size.min(items.len()));
            transaction.push_chunk(items);
            items = rest;
        }
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    /// Put items without a recorded outcome back at the head of their pending buffer.
    async fn requeue_unattempted(&self, transaction: &Transaction) {
        let unattempted: Vec<QueuedItem> = transaction
            .chunks
            .values()
            .flat_map(|chunk| chunk.items.iter())
            .filter(|queued| !transaction.has_outcome(queued.id))
            .cloned()
            .collect();
        if unattempted.is_empty() {
            return;
        }

        debug!(count = unattempted.len(), "requeueing unattempted items");
        self.state
            .lock()
            .await
            .pending
            .entry((transaction.queue.clone(), transaction.context.clone()))
            .or_default()
            .splice(0..0, unattempted);
    }

    async fn commit(&self, queue: String, context: String) -> Result<Transaction> {
        let span = start_commit_span(&queue, &context);

        async move {
            let mut transaction = self.open_transaction(&queue, &context).await?;
            record_transaction_id(&Span::current(), transaction.id);
            info!(
                chunks = transaction.chunks.len(),
                items = transaction.item_count(),
                "committing"
            );

            let chunk_ids: Vec<ChunkId> = transaction.chunks.keys().copied().collect();
            let mut failed = false;

            for chunk_id in chunk_ids {
                match process_chunk(self, &transaction, chunk_id).await {
                    Ok(results) => {
                        for (id, result) in results {
                            transaction.record_result(id, result)?;
                        }
                    }
                    Err(Error::ChunkExecution(chunk_error)) => {
                        failed = true;
                        for (id, error) in chunk_error.errors_by_id {
                            transaction.record_error(id, error)?;
                        }
                    }
                    Err(other) => {
                        self.requeue_unattempted(&transaction).await;
                        transaction.transition(TransactionState::Error)?;
                        self.settle(&transaction).await;
                        return Err(other);
                    }
                }
                self.save(&transaction).await;
            }

            transaction.transition(if failed {
                TransactionState::Error
            } else {
                TransactionState::Committed
            })?;
            self.settle(&transaction).await;
            Ok(transaction)
        }
        .instrument(span)
        .await
    }

    async fn settle(&self, transaction: &Transaction) {
        self.save(transaction).await;
        metrics::commits().add(
            1,
            &[
                KeyValue::new("queue", transaction.queue.clone()),
                KeyValue::new("state", transaction.state.to_string()),
            ],
        );
        record_transaction_state(&Span::current(), transaction.state);
    }
}

impl Registry for MemoryStore {
    async fn select(&self, query: Query) -> Result<Selection> {
        let state = self.state.lock().await;
        Ok(match query {
            Query::GetProcessor { queue } => {
                Selection::Processor(state.processors.get(&queue).cloned())
            }
            Query::GetTransaction { id } => {
                Selection::Transaction(state.transactions.get(&id).cloned())
            }
            Query::GetPendingItems { queue, context } => Selection::PendingItems(
                state
                    .pending
                    .get(&(queue, context))
                    .cloned()
                    .unwrap_or_default(),
            ),
        })
    }

    async fn dispatch(&self, action: Action) -> Result<ActionOutput> {
        match action {
            Action::RegisterProcessor { queue, processor } => {
                info!(%queue, "processor registered");
                self.state.lock().await.processors.insert(queue, processor);
                Ok(ActionOutput::Registered)
            }
            Action::EnqueueItem {
                queue,
                context,
                item,
            } => {
                let item_id = self.enqueue(queue, context, item).await;
                Ok(ActionOutput::Enqueued { item_id })
            }
            Action::Commit { queue, context } => {
                self.commit(queue, context).await.map(ActionOutput::Committed)
            }
        }
    }
}
