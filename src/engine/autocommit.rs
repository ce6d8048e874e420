//! Enqueue a single item and commit right away, so the caller gets back its
//! own outcome as if it had called the processor directly.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::{Action, Registry};

/// Enqueue `item` on `queue` under `context`, commit that queue/context and
/// return the item's result.
///
/// Every call commits immediately; there is no size or time threshold.
///
/// # Errors
///
/// Fails with [`Error::Item`] carrying the item's own entry from the
/// transaction's errors, never with the chunk-level failure. Errors raised
/// by the container itself (e.g. a missing processor) propagate unchanged.
pub async fn enqueue_item_and_autocommit<R: Registry>(
    registry: &R,
    queue: &str,
    context: &str,
    item: Value,
) -> Result<Value> {
    let item_id = registry
        .dispatch(Action::EnqueueItem {
            queue: queue.to_string(),
            context: context.to_string(),
            item,
        })
        .await?
        .into_item_id()?;

    let mut transaction = registry
        .dispatch(Action::Commit {
            queue: queue.to_string(),
            context: context.to_string(),
        })
        .await?
        .into_transaction()?;

    debug!(
        item_id = %item_id,
        transaction_id = %transaction.id,
        state = %transaction.state,
        "autocommit settled"
    );

    if let Some(error) = transaction.errors.remove(&item_id) {
        return Err(Error::Item(error));
    }

    // A failed transaction may still hold results for items whose chunk succeeded.
    transaction
        .results
        .remove(&item_id)
        .ok_or(Error::MissingOutcome(item_id))
}
