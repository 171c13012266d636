//! HealthRAG Core — error taxonomy and pipeline settings.

pub mod config;
pub mod error;

pub use config::{ProviderOverride, RagSettings};
pub use error::{Error, Result};
