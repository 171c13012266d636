//! HealthRAG retrieve — embedding client, vector-store client, retriever.
//!
//! The collection is pre-built. `Retriever::connect` refuses an unreachable
//! or empty collection so misconfiguration surfaces at start-up.

pub mod embedder;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_server;

pub use embedder::{Embedder, HttpEmbedder};
pub use retriever::Retriever;
pub use store::{ChromaStore, VectorStore};
pub use types::*;
