//! Runtime types.

use serde::{Deserialize, Serialize};

/// Answer returned to the caller of `ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(rename = "answer")]
    pub answer_text: String,
    /// Distinct source URLs in first-cited order.
    #[serde(rename = "sources")]
    pub unique_sources: Vec<String>,
}

impl AnswerResult {
    /// Build from a possibly repeating source list.
    pub fn new(answer_text: String, sources: Vec<String>) -> Self {
        let mut unique_sources: Vec<String> = Vec::with_capacity(sources.len());
        for source in sources {
            if !unique_sources.contains(&source) {
                unique_sources.push(source);
            }
        }
        Self {
            answer_text,
            unique_sources,
        }
    }
}

/// Pipeline status information.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    #[serde(rename = "llmProvider")]
    pub llm_provider: String,
    #[serde(rename = "llmModel")]
    pub llm_model: String,
    #[serde(rename = "refinerProvider")]
    pub refiner_provider: String,
    #[serde(rename = "refinerModel")]
    pub refiner_model: String,
    pub collection: String,
    #[serde(rename = "chunkCount")]
    pub chunk_count: usize,
    #[serde(rename = "topK")]
    pub top_k: usize,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}
