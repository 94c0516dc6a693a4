pub mod error;
pub mod instruction;
pub mod tape;
pub mod cache;
pub mod control;
pub mod stats;
pub mod engine;

pub use engine::{Engine, EngineConfig, EofPolicy, Outcome, execute};
pub use error::{Error, Result};
