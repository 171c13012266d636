//! Runtime for the `ask` pipeline.
//!
//! Refines follow-up questions, retrieves grounded context, assembles the
//! prompt and calls the answering model, with a deadline on every external
//! call and caller-driven cancellation.

mod deadline;
pub mod orchestrator;
pub mod prompt;
pub mod refiner;
pub mod types;

#[cfg(test)]
mod testing;

pub use orchestrator::{PipelineOptions, RagOrchestrator};
pub use prompt::{BuiltPrompt, PromptTemplate};
pub use refiner::QueryRefiner;
pub use tokio_util::sync::CancellationToken;
pub use types::*;
