//! Retrieval types.

use serde::{Deserialize, Serialize};

pub const NO_SOURCE: &str = "No Source";
pub const NO_TITLE: &str = "No Title";

/// A passage returned for one query. Lives for one `ask` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub source_url: String,
    pub section_title: String,
    /// Store-reported distance (lower = closer), when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl RetrievedPassage {
    pub fn new(
        text: impl Into<String>,
        source_url: impl Into<String>,
        section_title: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            section_title: section_title.into(),
            distance: None,
        }
    }
}

/// Raw ranked result of one vector-store query, closest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Option<serde_json::Value>>,
    pub distances: Vec<f32>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
