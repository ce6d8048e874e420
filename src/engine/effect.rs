//! Effect descriptors.
//!
//! An effect is plain data describing work for the [`Interpreter`] to carry
//! out. Building one performs nothing.
//!
//! [`Interpreter`]: super::Interpreter

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ChunkId, ItemId, Transaction};
use crate::registry::{Action, ActionOutput, Query, Selection};

/// Results of one chunk, keyed by the id of the item that produced each.
pub type ChunkResults = HashMap<ItemId, Value>;

#[derive(Debug, Clone)]
pub enum Effect {
    /// Read a value from the state container.
    Select(Query),
    /// Mutate the state container.
    Dispatch(Action),
    /// Run one chunk of `transaction` through its queue's processor.
    ProcessChunk {
        transaction: Transaction,
        chunk_id: ChunkId,
    },
    /// Enqueue one item, commit its queue/context, return the item's outcome.
    EnqueueItemAndAutocommit {
        queue: String,
        context: String,
        item: Value,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Select(query) => query.name(),
            Effect::Dispatch(action) => action.name(),
            Effect::ProcessChunk { .. } => "processChunk",
            Effect::EnqueueItemAndAutocommit { .. } => "enqueueItemAndAutocommit",
        }
    }
}

pub fn select(query: Query) -> Effect {
    Effect::Select(query)
}

pub fn dispatch(action: Action) -> Effect {
    Effect::Dispatch(action)
}

pub fn process_chunk(transaction: Transaction, chunk_id: ChunkId) -> Effect {
    Effect::ProcessChunk {
        transaction,
        chunk_id,
    }
}

pub fn enqueue_item_and_autocommit(
    queue: impl Into<String>,
    context: impl Into<String>,
    item: Value,
) -> Effect {
    Effect::EnqueueItemAndAutocommit {
        queue: queue.into(),
        context: context.into(),
        item,
    }
}

/// What a resolved [`Effect`] produced.
#[derive(Debug, Clone)]
pub enum EffectOutput {
    Selected(Selection),
    Dispatched(ActionOutput),
    ChunkResults(ChunkResults),
    ItemResult(Value),
}

impl EffectOutput {
    pub fn into_selection(self) -> Result<Selection> {
        match self {
            EffectOutput::Selected(selection) => Ok(selection),
            _ => Err(unexpected("select", "selection")),
        }
    }

    pub fn into_action_output(self) -> Result<ActionOutput> {
        match self {
            EffectOutput::Dispatched(output) => Ok(output),
            _ => Err(unexpected("dispatch", "action output")),
        }
    }

    pub fn into_chunk_results(self) -> Result<ChunkResults> {
        match self {
            EffectOutput::ChunkResults(results) => Ok(results),
            _ => Err(unexpected("processChunk", "chunk results")),
        }
    }

    pub fn into_item_result(self) -> Result<Value> {
        match self {
            EffectOutput::ItemResult(result) => Ok(result),
            _ => Err(unexpected("enqueueItemAndAutocommit", "item result")),
        }
    }
}

fn unexpected(effect: &'static str, expected: &'static str) -> Error {
    Error::UnexpectedOutput { effect, expected }
}
