//! Effect engine: chunk execution and the enqueue-then-commit path.

pub mod autocommit;
pub mod chunk;
pub mod effect;
pub mod interpreter;

pub use effect::{ChunkResults, Effect, EffectOutput};
pub use interpreter::Interpreter;
