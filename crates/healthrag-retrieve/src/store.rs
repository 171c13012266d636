//! Vector store client.
//!
//! `ChromaStore` talks to a Chroma server over its REST API. The collection
//! is built elsewhere; this side only counts and queries it.

use std::sync::Arc;

use async_trait::async_trait;
use healthrag_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::embedder::Embedder;
use crate::types::QueryResult;

/// Abstract interface over the persistent vector collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection name, for logs.
    fn name(&self) -> &str;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize>;

    /// The `k` nearest chunks to `text`, closest first.
    async fn query(&self, text: &str, k: usize) -> Result<QueryResult>;
}

/// A named Chroma collection, resolved to its id at connect time.
pub struct ChromaStore {
    http: Client,
    base_url: String,
    name: String,
    collection_id: String,
    embedder: Arc<dyn Embedder>,
}

impl ChromaStore {
    /// Look up the collection by name. A missing collection fails here.
    pub async fn connect(
        http: Client,
        base_url: &str,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = format!("{}/api/v1/collections/{}", base_url, collection);

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("vector store unreachable at {}: {}", base_url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::retrieval(format!(
                "empty or missing collection '{}' ({}): {}",
                collection, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed collection response: {}", e)))?;
        let collection_id = body["id"]
            .as_str()
            .ok_or_else(|| Error::retrieval("collection response has no id"))?
            .to_string();

        info!("Connected to collection '{}' at {}", collection, base_url);

        Ok(Self {
            http,
            base_url,
            name: collection.to_string(),
            collection_id,
            embedder,
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("query request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::retrieval(format!("vector store error {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed query response: {}", e)))
    }
}

/// Parse the first result list of a Chroma `query` response.
///
/// Entries whose document is null or not a string are dropped together with
/// their metadata and distance, so the three lists stay index-aligned.
pub fn parse_query_response(body: &Value) -> std::result::Result<QueryResult, String> {
    let docs: &[Value] = match body["documents"][0].as_array() {
        Some(docs) => docs.as_slice(),
        None if body["ids"][0].is_array() => &[],
        None => return Err("query response has no documents".into()),
    };

    let metas = body["metadatas"][0].as_array();
    let dists = body["distances"][0].as_array();

    let mut result = QueryResult::default();
    let mut aligned_distances = true;
    for (i, doc) in docs.iter().enumerate() {
        let Some(text) = doc.as_str() else {
            debug!("Skipping result {} without a document", i);
            continue;
        };
        result.documents.push(text.to_string());
        result.metadatas.push(
            metas
                .and_then(|m| m.get(i))
                .filter(|v| v.is_object())
                .cloned(),
        );
        match dists.and_then(|d| d.get(i)).and_then(Value::as_f64) {
            Some(d) => result.distances.push(d as f32),
            None => aligned_distances = false,
        }
    }
    if !aligned_distances {
        result.distances.clear();
    }

    Ok(result)
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self) -> Result<usize> {
        let url = format!("{}/api/v1/collections/{}/count", self.base_url, self.collection_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("count request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::retrieval(format!(
                "count failed with status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed count response: {}", e)))?;
        body.as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| Error::retrieval("count response is not a number"))
    }

    async fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        let embedding = self.embedder.embed(text).await?;
        let url = format!("{}/api/v1/collections/{}/query", self.base_url, self.collection_id);
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });

        let parsed = self.post_json(&url, &body).await?;
        let result = parse_query_response(&parsed).map_err(Error::retrieval)?;
        debug!("Collection '{}' returned {} results", self.name, result.len());
        Ok(result)
    }
}
