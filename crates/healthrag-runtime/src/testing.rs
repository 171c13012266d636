//! Scripted collaborators for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use healthrag_chat::{LlmClient, LlmRequest};
use healthrag_core::{Error, Result};
use healthrag_retrieve::{QueryResult, VectorStore};
use parking_lot::Mutex;
use serde_json::json;

pub enum Reply {
    Text(String),
    Fail(String),
    Slow(Duration),
}

/// LLM client that returns a fixed reply and records every request.
pub struct ScriptedClient {
    name: String,
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    pub fn new(name: &str, reply: Reply) -> Self {
        Self {
            name: name.to_string(),
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(name: &str, text: &str) -> Self {
        Self::new(name, Reply::Text(text.to_string()))
    }

    pub fn failing(name: &str, cause: &str) -> Self {
        Self::new(name, Reply::Fail(cause.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (system_instruction, user_prompt) of each call.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn provider(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((
            request.system_instruction.clone(),
            request.user_prompt.clone(),
        ));
        match &self.reply {
            Reply::Text(t) => Ok(t.clone()),
            Reply::Fail(cause) => Err(Error::generation(&self.name, cause)),
            Reply::Slow(d) => {
                tokio::time::sleep(*d).await;
                Ok("too late".into())
            }
        }
    }
}

/// Vector store with a fixed ranked result; records every query text.
pub struct FixedStore {
    count: usize,
    result: QueryResult,
    queries: Mutex<Vec<(String, usize)>>,
}

impl FixedStore {
    pub fn new(count: usize, result: QueryResult) -> Self {
        Self {
            count,
            result,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Store that ranks the given (text, source_url, section_title) triples.
    pub fn with_passages(passages: &[(&str, &str, &str)]) -> Self {
        let result = QueryResult {
            documents: passages.iter().map(|(t, _, _)| t.to_string()).collect(),
            metadatas: passages
                .iter()
                .map(|(_, url, title)| Some(json!({"source_url": url, "section_title": title})))
                .collect(),
            distances: (0..passages.len()).map(|i| i as f32 * 0.1).collect(),
        };
        Self::new(passages.len().max(1), result)
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    fn name(&self) -> &str {
        "health_knowledge"
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.count)
    }

    async fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        self.queries.lock().push((text.to_string(), k));
        Ok(self.result.clone())
    }
}
