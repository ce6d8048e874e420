//! Batch processors: queue-scoped handlers that turn many payloads into many results.
//!
//! A processor receives the payloads of one chunk, in chunk order, plus the
//! owning transaction. It must answer with one result per payload in the same
//! order, or fail with either a single error or one error per payload.
//!
//! Any `Fn(Vec<Value>, Transaction) -> impl Future` closure is a processor:
//!
//! ```
//! use batchq::model::{ItemError, ProcessorFailure};
//! use batchq::processor::{ProcessorRef, processor};
//! use serde_json::{Value, json};
//!
//! let double: ProcessorRef = processor(|items: Vec<Value>, _tx| async move {
//!     items
//!         .into_iter()
//!         .map(|v| v.as_i64().map(|n| json!(n * 2)))
//!         .collect::<Option<Vec<_>>>()
//!         .ok_or_else(|| ProcessorFailure::Single(ItemError::new("expected integers")))
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::{ProcessorFailure, Transaction};

/// Outcome of one processor call.
pub type ProcessorResult = std::result::Result<Vec<Value>, ProcessorFailure>;

/// Shared handle to a registered processor.
pub type ProcessorRef = Arc<dyn Processor>;

#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, items: Vec<Value>, transaction: Transaction) -> ProcessorResult;
}

impl std::fmt::Debug for dyn Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Processor")
    }
}

#[async_trait]
impl<F, Fut> Processor for F
where
    F: Fn(Vec<Value>, Transaction) -> Fut + Send + Sync,
    Fut: Future<Output = ProcessorResult> + Send + 'static,
{
    async fn process(&self, items: Vec<Value>, transaction: Transaction) -> ProcessorResult {
        self(items, transaction).await
    }
}

/// Wrap a closure as a [`ProcessorRef`].
pub fn processor<F, Fut>(f: F) -> ProcessorRef
where
    F: Fn(Vec<Value>, Transaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProcessorResult> + Send + 'static,
{
    Arc::new(f)
}
