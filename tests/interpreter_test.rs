//! Integration tests for effect dispatch and registry forwarding.

use batchq::engine::effect::{self, Effect};
use batchq::engine::{EffectOutput, Interpreter};
use batchq::error::{Error, Result};
use batchq::model::*;
use batchq::processor::processor;
use batchq::registry::{Action, ActionOutput, Query, Registry, Selection};
use batchq::store::MemoryStore;
use serde_json::{Value, json};
use std::sync::Mutex;

/// Registry that records every forwarded name and answers with fixed values.
#[derive(Default)]
struct ScriptedRegistry {
    calls: Mutex<Vec<&'static str>>,
    transaction: Mutex<Option<Transaction>>,
}

impl Registry for ScriptedRegistry {
    async fn select(&self, query: Query) -> Result<Selection> {
        self.calls.lock().unwrap().push(query.name());
        // Answers every query with pending items, whatever was asked.
        Ok(Selection::PendingItems(Vec::new()))
    }

    async fn dispatch(&self, action: Action) -> Result<ActionOutput> {
        self.calls.lock().unwrap().push(action.name());
        match action {
            Action::EnqueueItem { .. } => Ok(ActionOutput::Enqueued { item_id: ItemId::new() }),
            Action::Commit { .. } => self
                .transaction
                .lock()
                .unwrap()
                .clone()
                .map(ActionOutput::Committed)
                .ok_or_else(|| Error::Other("no transaction scripted".to_string())),
            Action::RegisterProcessor { .. } => Ok(ActionOutput::Registered),
        }
    }
}

#[tokio::test]
async fn select_and_dispatch_forward_by_name() {
    let engine = Interpreter::new(ScriptedRegistry::default());

    engine
        .run(effect::select(Query::GetPendingItems {
            queue: "posts".to_string(),
            context: "ctx".to_string(),
        }))
        .await
        .unwrap();
    engine
        .run(effect::dispatch(Action::EnqueueItem {
            queue: "posts".to_string(),
            context: "ctx".to_string(),
            item: json!(1),
        }))
        .await
        .unwrap();

    assert_eq!(
        *engine.registry().calls.lock().unwrap(),
        vec!["getPendingItems", "enqueueItem"]
    );
}

#[tokio::test]
async fn wrong_shaped_answer_is_reported() {
    let engine = Interpreter::new(ScriptedRegistry::default());

    let err = match engine.get_processor("posts").await {
        Err(err) => err,
        Ok(_) => panic!("expected an error"),
    };

    assert!(matches!(
        err,
        Error::UnexpectedOutput {
            effect: "getProcessor",
            ..
        }
    ));
}

#[tokio::test]
async fn chunk_with_wrong_shaped_processor_answer_fails() {
    let engine = Interpreter::new(ScriptedRegistry::default());
    let mut tx = Transaction::new("posts", "ctx");
    let chunk_id = tx.push_chunk(vec![QueuedItem {
        id: ItemId::new(),
        item: json!(1),
    }]);

    let err = engine.process_chunk(tx, chunk_id).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedOutput { .. }));
}

#[tokio::test]
async fn errored_transaction_without_an_entry_reports_missing_outcome() {
    let registry = ScriptedRegistry::default();
    let engine = Interpreter::new(registry);

    // The scripted container mints a fresh id per enqueue, so the errored
    // transaction has no entry for it.
    let mut tx = Transaction::new("posts", "ctx");
    tx.transition(TransactionState::Error).unwrap();
    *engine.registry().transaction.lock().unwrap() = Some(tx);

    let err = engine
        .enqueue_item_and_autocommit("posts", "ctx", json!(1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingOutcome(_)));
    assert_eq!(
        *engine.registry().calls.lock().unwrap(),
        vec!["enqueueItem", "commit"]
    );
}

#[tokio::test]
async fn every_effect_kind_resolves_against_the_memory_store() {
    let engine = Interpreter::new(MemoryStore::new());

    let registered = engine
        .run(effect::dispatch(Action::RegisterProcessor {
            queue: "posts".to_string(),
            processor: processor(|items: Vec<Value>, _tx: Transaction| async move {
                Ok::<_, ProcessorFailure>(items)
            }),
        }))
        .await
        .unwrap();
    assert!(matches!(registered, EffectOutput::Dispatched(ActionOutput::Registered)));

    let selected = engine
        .run(effect::select(Query::GetProcessor {
            queue: "posts".to_string(),
        }))
        .await
        .unwrap();
    assert!(matches!(selected, EffectOutput::Selected(Selection::Processor(Some(_)))));

    let item_id = engine.enqueue_item("posts", "ctx", json!("x")).await.unwrap();
    let tx = engine.commit("posts", "ctx").await.unwrap();
    let chunk_id = *tx.chunks.keys().next().expect("one chunk");

    // Re-running a committed chunk yields the same positional mapping.
    let rerun = engine
        .run(Effect::ProcessChunk {
            transaction: tx.clone(),
            chunk_id,
        })
        .await
        .unwrap()
        .into_chunk_results()
        .unwrap();
    assert_eq!(rerun[&item_id], json!("x"));

    let fetched = engine.get_transaction(tx.id).await.unwrap();
    assert_eq!(fetched, Some(tx));
}

#[test]
fn effect_names_match_container_names() {
    assert_eq!(
        effect::select(Query::GetProcessor {
            queue: "q".to_string()
        })
        .name(),
        "getProcessor"
    );
    assert_eq!(
        effect::dispatch(Action::Commit {
            queue: "q".to_string(),
            context: "c".to_string()
        })
        .name(),
        "commit"
    );
    assert_eq!(
        effect::enqueue_item_and_autocommit("q", "c", json!(null)).name(),
        "enqueueItemAndAutocommit"
    );
    assert_eq!(
        effect::process_chunk(Transaction::new("q", "c"), ChunkId(0)).name(),
        "processChunk"
    );
}
