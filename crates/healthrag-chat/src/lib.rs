//! HealthRAG chat — provider registry and LLM transports (OpenAI/Groq/Gemini).
//!
//! Every transport implements [`LlmClient`], so the pipeline runs unchanged
//! against any configured backend.

pub mod providers;
pub mod registry;
pub mod types;

#[cfg(test)]
mod test_server;

pub use providers::{create_client, LlmClient};
pub use registry::{ProviderConfig, ProviderRegistry};
pub use types::*;
