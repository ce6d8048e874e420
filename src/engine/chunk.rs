//! Chunk execution: run a chunk through its queue's processor and attribute
//! the outcome to each item.

use std::collections::HashMap;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde_json::json;
use tracing::{Instrument, debug, warn};

use crate::error::{Error, Result};
use crate::model::{ChunkError, ChunkId, ItemError, ItemId, ProcessorFailure, Transaction};
use crate::registry::{Query, Registry};
use crate::telemetry::batch::start_chunk_span;
use crate::telemetry::metrics;

use super::effect::ChunkResults;

/// Run chunk `chunk_id` of `transaction` and map each result to its item.
///
/// Results are attributed by position: the i-th result belongs to the i-th
/// item of the chunk.
///
/// # Errors
///
/// - [`Error::ChunkNotFound`] if the transaction has no such chunk.
/// - [`Error::ProcessorNotRegistered`] if the queue has no processor.
/// - [`Error::ChunkExecution`] if the processor fails, or answers with a
///   different number of results than it was given items.
pub async fn process_chunk<R: Registry>(
    registry: &R,
    transaction: &Transaction,
    chunk_id: ChunkId,
) -> Result<ChunkResults> {
    let chunk = transaction
        .chunks
        .get(&chunk_id)
        .ok_or(Error::ChunkNotFound {
            transaction_id: transaction.id,
            chunk_id,
        })?;

    let queue = transaction.queue.as_str();
    let processor = registry
        .select(Query::GetProcessor {
            queue: queue.to_string(),
        })
        .await?
        .into_processor()?
        .ok_or_else(|| Error::ProcessorNotRegistered {
            queue: queue.to_string(),
        })?;

    let (item_ids, items) = chunk.split();
    let span = start_chunk_span(queue, transaction.id, chunk_id, item_ids.len());

    async move {
        let start = Instant::now();
        let outcome = processor.process(items, transaction.clone()).await;
        metrics::chunk_duration_ms().record(
            start.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("queue", queue.to_string())],
        );

        let outcome = outcome.and_then(|results| {
            if results.len() == item_ids.len() {
                Ok(results)
            } else {
                Err(ProcessorFailure::Single(
                    ItemError::new(format!(
                        "processor returned {} results for {} items",
                        results.len(),
                        item_ids.len()
                    ))
                    .with_data(json!({
                        "expected": item_ids.len(),
                        "actual": results.len(),
                    })),
                ))
            }
        });

        match outcome {
            Ok(results) => {
                metrics::chunks_processed().add(
                    1,
                    &[
                        KeyValue::new("queue", queue.to_string()),
                        KeyValue::new("result", "ok"),
                    ],
                );
                debug!(items = item_ids.len(), "chunk processed");
                Ok(item_ids.into_iter().zip(results).collect())
            }
            Err(failure) => {
                let errors_by_id = errors_by_id(&item_ids, &failure);
                metrics::chunks_processed().add(
                    1,
                    &[
                        KeyValue::new("queue", queue.to_string()),
                        KeyValue::new("result", "error"),
                    ],
                );
                metrics::items_failed().add(
                    errors_by_id.len() as u64,
                    &[KeyValue::new("queue", queue.to_string())],
                );
                warn!(items = item_ids.len(), error = %failure, "chunk failed");
                Err(ChunkError {
                    failure,
                    errors_by_id,
                }
                .into())
            }
        }
    }
    .instrument(span)
    .await
}

/// Attribute a processor failure to every item of the call.
///
/// A per-item failure is matched by position; items past the end of the
/// error list get a placeholder error.
pub fn errors_by_id(item_ids: &[ItemId], failure: &ProcessorFailure) -> HashMap<ItemId, ItemError> {
    item_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let error = match failure {
                ProcessorFailure::Single(error) => error.clone(),
                ProcessorFailure::PerItem(errors) => errors.get(i).cloned().unwrap_or_else(|| {
                    ItemError::new(format!("processor reported no error for item at position {i}"))
                }),
            };
            (*id, error)
        })
        .collect()
}
