//! RAG orchestrator — refine → retrieve → build prompt → generate.

use std::sync::Arc;
use std::time::Duration;

use healthrag_chat::{create_client, ChatTurn, LlmClient, LlmRequest, ProviderRegistry};
use healthrag_core::{Error, RagSettings, Result};
use healthrag_retrieve::{ChromaStore, HttpEmbedder, Retriever};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::deadline::bounded;
use crate::prompt::PromptTemplate;
use crate::refiner::QueryRefiner;
use crate::types::*;

/// Tunables of one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub top_k: usize,
    pub request_timeout: Duration,
    pub empty_knowledge_message: String,
    pub log_prompts: bool,
    pub template: PromptTemplate,
}

impl PipelineOptions {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            top_k: settings.top_k,
            request_timeout: settings.request_timeout(),
            empty_knowledge_message: settings.empty_knowledge_message.clone(),
            log_prompts: settings.log_prompts,
            template: PromptTemplate::from_settings(settings),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_k: healthrag_core::config::DEFAULT_TOP_K,
            request_timeout: Duration::from_secs(healthrag_core::config::DEFAULT_TIMEOUT_SECS),
            empty_knowledge_message: healthrag_core::config::DEFAULT_EMPTY_KNOWLEDGE_MESSAGE.into(),
            log_prompts: false,
            template: PromptTemplate::default(),
        }
    }
}

/// Owns the retriever and both LLM clients. Stateless across `ask` calls.
pub struct RagOrchestrator {
    primary: Arc<dyn LlmClient>,
    refiner: QueryRefiner,
    retriever: Retriever,
    options: PipelineOptions,
}

impl RagOrchestrator {
    pub fn new(
        primary: Arc<dyn LlmClient>,
        refiner_client: Arc<dyn LlmClient>,
        retriever: Retriever,
        options: PipelineOptions,
    ) -> Self {
        let refiner = QueryRefiner::new(refiner_client, options.request_timeout);
        Self {
            primary,
            refiner,
            retriever,
            options,
        }
    }

    /// Build every collaborator from settings. Fails fast on any misconfiguration.
    pub async fn connect(settings: &RagSettings) -> Result<Self> {
        let registry = ProviderRegistry::from_settings(settings)?;
        let primary = create_client(registry.resolve(&settings.active_provider)?)?;
        let refiner_client = create_client(registry.resolve(&settings.refiner_provider)?)?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::retrieval(format!("HTTP client: {}", e)))?;
        let embedder = Arc::new(HttpEmbedder::new(
            http.clone(),
            &settings.embedding_url,
            &settings.embedding_model,
            settings.embedding_api_key.clone(),
        ));

        let timeout = settings.request_timeout();
        let never = CancellationToken::new();
        let store = bounded(
            "connect collection",
            timeout,
            &never,
            ChromaStore::connect(http, &settings.chroma_url, &settings.collection, embedder),
        )
        .await?;
        let retriever = bounded(
            "count collection",
            timeout,
            &never,
            Retriever::connect(Arc::new(store)),
        )
        .await?;

        info!(
            "RAG pipeline ready: provider={} refiner={} collection={} k={}",
            settings.active_provider, settings.refiner_provider, settings.collection, settings.top_k
        );

        Ok(Self::new(
            primary,
            refiner_client,
            retriever,
            PipelineOptions::from_settings(settings),
        ))
    }

    /// Answer `question` grounded in retrieved passages.
    pub async fn ask(&self, question: &str, history: &[ChatTurn]) -> Result<AnswerResult> {
        self.ask_with_cancel(question, history, &CancellationToken::new())
            .await
    }

    /// Like [`ask`](Self::ask), abandoned with `Cancelled` once `cancel` fires.
    pub async fn ask_with_cancel(
        &self,
        question: &str,
        history: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<AnswerResult> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("ask", %request_id, provider = self.primary.provider());

        let result = self.run(question, history, cancel).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!("ask failed: {}", e));
        }
        result
    }

    async fn run(
        &self,
        question: &str,
        history: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question is empty".into()));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let timeout = self.options.request_timeout;

        let search_query = self.refiner.refine(question, history, cancel).await?;

        info!("Searching context for '{}'", search_query);
        let passages = bounded(
            "retrieve",
            timeout,
            cancel,
            self.retriever.retrieve(&search_query, self.options.top_k),
        )
        .await?;

        if passages.is_empty() {
            info!("No passages found; returning the empty-knowledge answer");
            return Ok(AnswerResult::new(
                self.options.empty_knowledge_message.clone(),
                Vec::new(),
            ));
        }

        let built = self.options.template.build(&passages, &search_query);
        if self.options.log_prompts {
            debug!("Constructed prompt:\n{}", built.user_prompt);
        }
        let request = LlmRequest::new(self.options.template.system_instruction(), built.user_prompt);

        info!("Sending {} passages to {}", passages.len(), self.primary.provider());
        let answer = bounded(
            "generate",
            timeout,
            cancel,
            self.primary.generate(&request),
        )
        .await?;

        Ok(AnswerResult::new(answer, built.sources))
    }

    /// Get pipeline status.
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            llm_provider: self.primary.provider().to_string(),
            llm_model: self.primary.model().to_string(),
            refiner_provider: self.refiner.provider().to_string(),
            refiner_model: self.refiner.model().to_string(),
            collection: self.retriever.collection().to_string(),
            chunk_count: self.retriever.chunk_count(),
            top_k: self.options.top_k,
            timeout_secs: self.options.request_timeout.as_secs(),
        }
    }
}
