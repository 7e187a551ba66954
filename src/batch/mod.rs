//! Batch orchestration module
//!
//! Resolves which sources to run and runs them sequentially, once or on a
//! fixed interval until cancelled.

mod orchestrator;
mod selection;

pub use orchestrator::{watch_interrupts, BatchSettings, Orchestrator};
pub use selection::{select_sources, Selection, SourceSelection};
