//! Pipeline settings: JSON file first, then environment, then defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_COLLECTION: &str = "health_knowledge";
pub const DEFAULT_EMBEDDING_MODEL: &str = "paraphrase-multilingual-mpnet-base-v2";
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "the same language the user writes in";
pub const DEFAULT_EMPTY_KNOWLEDGE_MESSAGE: &str =
    "Sorry, my health knowledge base is still empty. Please run the indexing step first.";

/// Per-provider overrides of the built-in registry table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Alternative endpoint (proxy or compatible gateway).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Stored pipeline settings (optionally persisted to `healthrag.json`).
#[derive(Clone, Serialize, Deserialize)]
pub struct RagSettings {
    #[serde(default = "default_active_provider")]
    pub active_provider: String,
    #[serde(default = "default_refiner_provider")]
    pub refiner_provider: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_chroma_url")]
    pub chroma_url: String,
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Target language the answering model must respond in.
    #[serde(default = "default_response_language")]
    pub response_language: String,
    /// Returned verbatim when retrieval finds nothing.
    #[serde(default = "default_empty_message")]
    pub empty_knowledge_message: String,
    /// Replaces the built-in system instruction when set. `{language}` is substituted.
    #[serde(default)]
    pub system_instruction: Option<String>,
    #[serde(default = "default_log_prompts")]
    pub log_prompts: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderOverride>,
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub groq_api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub google_api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding_api_key: Option<String>,
    /// Path to the settings file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.trim().parse().ok())
}

fn default_active_provider() -> String {
    env_var("ACTIVE_MODEL").unwrap_or_else(|| "groq".into()).to_lowercase()
}
fn default_refiner_provider() -> String {
    env_var("REFINER_MODEL")
        .unwrap_or_else(|| "groq-small".into())
        .to_lowercase()
}
fn default_top_k() -> usize {
    env_parse("RAG_TOP_K").unwrap_or(DEFAULT_TOP_K)
}
fn default_timeout_secs() -> u64 {
    env_parse("RAG_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS)
}
fn default_collection() -> String {
    env_var("CHROMA_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.into())
}
fn default_chroma_url() -> String {
    env_var("CHROMA_URL").unwrap_or_else(|| "http://localhost:8000".into())
}
fn default_embedding_url() -> String {
    env_var("EMBEDDING_URL").unwrap_or_else(|| "http://localhost:8080/v1".into())
}
fn default_embedding_model() -> String {
    env_var("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into())
}
fn default_response_language() -> String {
    env_var("RAG_LANGUAGE").unwrap_or_else(|| DEFAULT_RESPONSE_LANGUAGE.into())
}
fn default_empty_message() -> String {
    DEFAULT_EMPTY_KNOWLEDGE_MESSAGE.into()
}
fn default_log_prompts() -> bool {
    env_parse("RAG_LOG_PROMPTS").unwrap_or(false)
}
fn default_port() -> u16 {
    env_parse("PORT").unwrap_or(3003)
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            active_provider: default_active_provider(),
            refiner_provider: default_refiner_provider(),
            top_k: default_top_k(),
            request_timeout_secs: default_timeout_secs(),
            collection: default_collection(),
            chroma_url: default_chroma_url(),
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
            response_language: default_response_language(),
            empty_knowledge_message: default_empty_message(),
            system_instruction: None,
            log_prompts: default_log_prompts(),
            port: default_port(),
            providers: BTreeMap::new(),
            openai_api_key: None,
            groq_api_key: None,
            google_api_key: None,
            embedding_api_key: None,
            config_path: PathBuf::new(),
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for RagSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSettings")
            .field("active_provider", &self.active_provider)
            .field("refiner_provider", &self.refiner_provider)
            .field("top_k", &self.top_k)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("collection", &self.collection)
            .field("chroma_url", &self.chroma_url)
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field("response_language", &self.response_language)
            .field("log_prompts", &self.log_prompts)
            .field("port", &self.port)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl RagSettings {
    /// Load settings from file, falling back to env vars and defaults.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: &Path) -> Result<Self> {
        let mut settings: RagSettings = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                Error::Config(format!("{}: {}", config_path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RagSettings::default(),
            Err(e) => return Err(e.into()),
        };

        settings.config_path = config_path.to_path_buf();
        settings.fill_credentials_from_env();
        settings.active_provider = settings.active_provider.to_lowercase();
        settings.refiner_provider = settings.refiner_provider.to_lowercase();
        settings.validate()?;
        Ok(settings)
    }

    /// Write the effective settings (env and defaults) to a new file at `config_path`.
    pub fn init(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Err(Error::Config(format!(
                "{} already exists",
                config_path.display()
            )));
        }
        let settings = Self::load(config_path)?;
        settings.save()?;
        Ok(settings)
    }

    fn fill_credentials_from_env(&mut self) {
        if self.openai_api_key.is_none() {
            self.openai_api_key = env_var("OPENAI_API_KEY");
        }
        if self.groq_api_key.is_none() {
            self.groq_api_key = env_var("GROQ_API_KEY");
        }
        if self.google_api_key.is_none() {
            self.google_api_key = env_var("GOOGLE_API_KEY");
        }
        if self.embedding_api_key.is_none() {
            self.embedding_api_key = env_var("EMBEDDING_API_KEY");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::Config("collection name is empty".into()));
        }
        Ok(())
    }

    /// Credential for a provider family key (`openai`, `groq`, `gemini`).
    pub fn api_key_for(&self, family: &str) -> Option<&str> {
        let key = match family {
            "openai" => self.openai_api_key.as_deref(),
            "groq" => self.groq_api_key.as_deref(),
            "gemini" => self.google_api_key.as_deref(),
            _ => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Save settings to disk. Credentials are never written.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved settings to {}", self.config_path.display());
        Ok(())
    }
}
