//! Shared application state.

use std::time::Instant;

use healthrag_runtime::RagOrchestrator;

/// Shared application state accessible from all route handlers.
///
/// Holds no conversation history: each request carries its own.
pub struct AppState {
    pub orchestrator: RagOrchestrator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: RagOrchestrator) -> Self {
        Self {
            orchestrator,
            started_at: Instant::now(),
        }
    }
}
