//! Ranked passages with source attribution.

use std::sync::Arc;

use healthrag_core::{Error, Result};
use tracing::{debug, info};

use crate::store::VectorStore;
use crate::types::{RetrievedPassage, NO_SOURCE, NO_TITLE};

/// Wraps a vector store that is known to be reachable and non-empty.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    chunk_count: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("collection", &self.store.name())
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl Retriever {
    /// Verify the collection before accepting any query.
    pub async fn connect(store: Arc<dyn VectorStore>) -> Result<Self> {
        let chunk_count = match store.count().await {
            Ok(n) => n,
            Err(Error::Retrieval { reason }) => {
                return Err(Error::retrieval(format!("empty or missing collection: {}", reason)))
            }
            Err(e) => return Err(e),
        };

        if chunk_count == 0 {
            return Err(Error::retrieval("empty or missing collection"));
        }

        info!(
            "Retriever ready on '{}' ({} chunks)",
            store.name(),
            chunk_count
        );
        Ok(Self { store, chunk_count })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn collection(&self) -> &str {
        self.store.name()
    }

    /// At most `k` non-blank passages, in the store's ranking order.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let result = self.store.query(query, k).await?;

        let passages: Vec<RetrievedPassage> = result
            .documents
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .take(k)
            .map(|(i, text)| {
                let metadata = result.metadatas.get(i).and_then(|m| m.as_ref());
                RetrievedPassage {
                    text,
                    source_url: metadata_str(metadata, "source_url").unwrap_or(NO_SOURCE).to_string(),
                    section_title: metadata_str(metadata, "section_title")
                        .unwrap_or(NO_TITLE)
                        .to_string(),
                    distance: result.distances.get(i).copied(),
                }
            })
            .collect();

        debug!("Retrieved {} passages for query '{}'", passages.len(), query);
        Ok(passages)
    }
}

fn metadata_str<'a>(metadata: Option<&'a serde_json::Value>, key: &str) -> Option<&'a str> {
    metadata
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        count: Result<usize>,
        result: QueryResult,
        queries: AtomicUsize,
    }

    impl FixedStore {
        fn new(count: usize, result: QueryResult) -> Self {
            Self {
                count: Ok(count),
                result,
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        fn name(&self) -> &str {
            "health_knowledge"
        }

        async fn count(&self) -> Result<usize> {
            match &self.count {
                Ok(n) => Ok(*n),
                Err(e) => Err(Error::retrieval(e.to_string())),
            }
        }

        async fn query(&self, _text: &str, _k: usize) -> Result<QueryResult> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    fn ranked(n: usize) -> QueryResult {
        QueryResult {
            documents: (0..n).map(|i| format!("passage {}", i)).collect(),
            metadatas: (0..n)
                .map(|i| Some(json!({"source_url": format!("https://example.org/{}", i), "section_title": format!("Section {}", i)})))
                .collect(),
            distances: (0..n).map(|i| i as f32 * 0.1).collect(),
        }
    }

    #[tokio::test]
    async fn test_connect_empty_collection_fails() {
        let store = Arc::new(FixedStore::new(0, QueryResult::default()));
        let err = Retriever::connect(store).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval { ref reason } if reason == "empty or missing collection"));
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let store = Arc::new(FixedStore {
            count: Err(Error::retrieval("connection refused")),
            result: QueryResult::default(),
            queries: AtomicUsize::new(0),
        });
        let err = Retriever::connect(store).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval { ref reason } if reason.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_retrieve_truncates_to_k_in_order() {
        let store = Arc::new(FixedStore::new(42, ranked(6)));
        let retriever = Retriever::connect(store).await.unwrap();
        assert_eq!(retriever.chunk_count(), 42);

        let passages = retriever.retrieve("fever", 3).await.unwrap();
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].text, "passage 0");
        assert_eq!(passages[2].source_url, "https://example.org/2");
        assert_eq!(passages[1].section_title, "Section 1");
        let distances: Vec<f32> = passages.iter().filter_map(|p| p.distance).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_retrieve_missing_metadata_uses_sentinels() {
        let result = QueryResult {
            documents: vec!["a".into(), "b".into(), "c".into()],
            metadatas: vec![None, Some(json!({"source_url": ""})), Some(json!({"section_title": "Dosis"}))],
            distances: Vec::new(),
        };
        let retriever = Retriever::connect(Arc::new(FixedStore::new(3, result))).await.unwrap();

        let passages = retriever.retrieve("dose", 5).await.unwrap();
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].source_url, NO_SOURCE);
        assert_eq!(passages[0].section_title, NO_TITLE);
        assert_eq!(passages[1].source_url, NO_SOURCE);
        assert_eq!(passages[2].section_title, "Dosis");
        assert_eq!(passages[2].source_url, NO_SOURCE);
        assert!(passages[0].distance.is_none());
    }

    #[tokio::test]
    async fn test_retrieve_skips_blank_documents() {
        let mut result = ranked(4);
        result.documents[1] = "  ".into();
        let retriever = Retriever::connect(Arc::new(FixedStore::new(4, result))).await.unwrap();

        let passages = retriever.retrieve("fever", 3).await.unwrap();
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["passage 0", "passage 2", "passage 3"]);
        assert_eq!(passages[1].source_url, "https://example.org/2");
        assert_eq!(passages[1].distance, Some(0.2));
    }

    #[tokio::test]
    async fn test_retrieve_zero_k_skips_store() {
        let store = Arc::new(FixedStore::new(5, ranked(5)));
        let retriever = Retriever::connect(store.clone()).await.unwrap();
        assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    }
}
