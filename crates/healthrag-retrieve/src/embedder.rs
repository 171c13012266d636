//! Query embedding.
//!
//! The `Embedder` trait abstracts over the external embedding service.
//! `HttpEmbedder` speaks the OpenAI-compatible `/embeddings` endpoint, which
//! local servers (text-embeddings-inference, infinity, vLLM) also expose.
//! The model must be the one the collection was indexed with.

use async_trait::async_trait;
use healthrag_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model the vectors come from.
    fn model_name(&self) -> &str;
}

/// Embedder backed by an OpenAI-compatible HTTP endpoint.
pub struct HttpEmbedder {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(http: Client, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        }
    }
}

/// Extract the first embedding vector from an `/embeddings` response.
pub fn parse_embedding_response(body: &Value) -> std::result::Result<Vec<f32>, String> {
    let values = body["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| "response has no data[0].embedding".to_string())?;

    let embedding: Vec<f32> = values
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<_>>()
        .ok_or_else(|| "embedding contains non-numeric values".to_string())?;

    if embedding.is_empty() {
        return Err("embedding is empty".into());
    }
    Ok(embedding)
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&json!({ "model": self.model, "input": [text] }));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::retrieval(format!("embedding API error {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed embedding response: {}", e)))?;
        let embedding = parse_embedding_response(&body).map_err(Error::retrieval)?;
        debug!("Embedded query with {} (dim={})", self.model, embedding.len());
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
