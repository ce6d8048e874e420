//! Effect interpreter: resolves [`Effect`]s against a state container.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::model::{ChunkId, ItemId, QueuedItem, Transaction, TransactionId};
use crate::processor::ProcessorRef;
use crate::registry::{Action, ActionOutput, Query, Registry, Selection};

use super::autocommit::enqueue_item_and_autocommit;
use super::chunk::process_chunk;
use super::effect::{self, ChunkResults, Effect, EffectOutput};

/// Runs effects against one registry. Cloning shares the registry.
pub struct Interpreter<R> {
    registry: Arc<R>,
}

impl<R> Clone for Interpreter<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: Registry> Interpreter<R> {
    pub fn new(registry: R) -> Self {
        Self::from_arc(Arc::new(registry))
    }

    pub fn from_arc(registry: Arc<R>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Resolve one effect. Returns only once the handler has finished.
    pub async fn run(&self, effect: Effect) -> Result<EffectOutput> {
        debug!(effect = effect.name(), "running effect");
        match effect {
            Effect::Select(query) => self.select(query).await.map(EffectOutput::Selected),
            Effect::Dispatch(action) => self.dispatch(action).await.map(EffectOutput::Dispatched),
            Effect::ProcessChunk {
                transaction,
                chunk_id,
            } => process_chunk(&*self.registry, &transaction, chunk_id)
                .await
                .map(EffectOutput::ChunkResults),
            Effect::EnqueueItemAndAutocommit {
                queue,
                context,
                item,
            } => enqueue_item_and_autocommit(&*self.registry, &queue, &context, item)
                .await
                .map(EffectOutput::ItemResult),
        }
    }

    /// Forward a query to the container and return its answer unchanged.
    pub async fn select(&self, query: Query) -> Result<Selection> {
        debug!(selector = query.name(), "select");
        self.registry.select(query).await
    }

    /// Forward an action to the container and return its answer unchanged.
    pub async fn dispatch(&self, action: Action) -> Result<ActionOutput> {
        debug!(action = action.name(), "dispatch");
        self.registry.dispatch(action).await
    }

    // -----------------------------------------------------------------------
    // Typed shortcuts
    // -----------------------------------------------------------------------

    pub async fn get_processor(&self, queue: impl Into<String>) -> Result<Option<ProcessorRef>> {
        self.run(effect::select(Query::GetProcessor {
            queue: queue.into(),
        }))
        .await?
        .into_selection()?
        .into_processor()
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.run(effect::select(Query::GetTransaction { id }))
            .await?
            .into_selection()?
            .into_transaction()
    }

    pub async fn get_pending_items(
        &self,
        queue: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Vec<QueuedItem>> {
        self.run(effect::select(Query::GetPendingItems {
            queue: queue.into(),
            context: context.into(),
        }))
        .await?
        .into_selection()?
        .into_pending_items()
    }

    pub async fn register_processor(
        &self,
        queue: impl Into<String>,
        processor: ProcessorRef,
    ) -> Result<()> {
        self.run(effect::dispatch(Action::RegisterProcessor {
            queue: queue.into(),
            processor,
        }))
        .await?
        .into_action_output()?
        .into_registered()
    }

    pub async fn enqueue_item(
        &self,
        queue: impl Into<String>,
        context: impl Into<String>,
        item: Value,
    ) -> Result<ItemId> {
        self.run(effect::dispatch(Action::EnqueueItem {
            queue: queue.into(),
            context: context.into(),
            item,
        }))
        .await?
        .into_action_output()?
        .into_item_id()
    }

    pub async fn commit(
        &self,
        queue: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Transaction> {
        self.run(effect::dispatch(Action::Commit {
            queue: queue.into(),
            context: context.into(),
        }))
        .await?
        .into_action_output()?
        .into_transaction()
    }

    pub async fn process_chunk(
        &self,
        transaction: Transaction,
        chunk_id: ChunkId,
    ) -> Result<ChunkResults> {
        self.run(effect::process_chunk(transaction, chunk_id))
            .await?
            .into_chunk_results()
    }

    pub async fn enqueue_item_and_autocommit(
        &self,
        queue: impl Into<String>,
        context: impl Into<String>,
        item: Value,
    ) -> Result<Value> {
        self.run(effect::enqueue_item_and_autocommit(queue, context, item))
            .await?
            .into_item_result()
    }
}
