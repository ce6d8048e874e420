//! # batchq
//!
//! Callers submit single items to a named queue; execution happens in bulk.
//! Pending items are grouped into chunks and handed to the queue's processor
//! in one call, and each caller still gets back its own result or error.
//!
//! The [`engine`] resolves effect descriptors against a state container
//! implementing [`registry::Registry`]. [`store::MemoryStore`] is an
//! in-memory container.
//!
//! ```no_run
//! use batchq::engine::Interpreter;
//! use batchq::model::ProcessorFailure;
//! use batchq::processor::processor;
//! use batchq::store::MemoryStore;
//! use serde_json::{Value, json};
//!
//! # async fn demo() -> batchq::error::Result<()> {
//! let engine = Interpreter::new(MemoryStore::new());
//! engine
//!     .register_processor(
//!         "posts",
//!         processor(|items: Vec<Value>, _tx| async move {
//!             Ok::<_, ProcessorFailure>(items)
//!         }),
//!     )
//!     .await?;
//!
//! let echoed = engine
//!     .enqueue_item_and_autocommit("posts", "request-1", json!({"title": "hi"}))
//!     .await?;
//! assert_eq!(echoed, json!({"title": "hi"}));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod processor;
pub mod registry;
pub mod store;
pub mod telemetry;
