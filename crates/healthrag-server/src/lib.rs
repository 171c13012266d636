//! HealthRAG server — HTTP surface over the `ask` pipeline.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
