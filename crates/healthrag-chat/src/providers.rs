//! External LLM provider transports.
//!
//! OpenAI and Groq share the chat-completions request shape. Gemini uses
//! `generateContent` with the system instruction in its own field.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use healthrag_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::registry::ProviderConfig;
use crate::types::{LlmRequest, ProviderFamily, Usage};

/// One uniform capability over every provider family.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider identifier, e.g. `groq-small`.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Send exactly one request and return the generated text.
    async fn generate(&self, request: &LlmRequest) -> Result<String>;
}

/// Build the transport for a resolved provider. Fails fast on a missing credential.
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn LlmClient>> {
    let family = ProviderFamily::from_identifier(&config.identifier)
        .ok_or_else(|| Error::UnknownProvider(config.identifier.clone()))?;
    if family != config.family {
        return Err(Error::Config(format!(
            "provider '{}' belongs to {}, not {}",
            config.identifier, family, config.family
        )));
    }

    if !config.has_credential() {
        return Err(Error::MissingCredential(config.identifier.clone()));
    }

    let http = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::generation(&config.identifier, e))?;

    info!(
        "LLM client ready: {} | model: {}",
        config.identifier, config.model_name
    );

    Ok(match family {
        ProviderFamily::OpenAI | ProviderFamily::Groq => {
            Arc::new(OpenAICompatClient::new(http, config.clone()))
        }
        ProviderFamily::Gemini => Arc::new(GeminiClient::new(http, config.clone())),
    })
}

// ---------------------------------------------------------------
// OpenAI-compatible (OpenAI, Groq)
// ---------------------------------------------------------------

pub struct OpenAICompatClient {
    http: Client,
    config: ProviderConfig,
    url: String,
}

impl OpenAICompatClient {
    pub fn new(http: Client, config: ProviderConfig) -> Self {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Self { http, config, url }
    }
}

/// Request body for chat-completions endpoints.
pub fn openai_body(config: &ProviderConfig, request: &LlmRequest) -> Value {
    json!({
        "model": config.model_name,
        "messages": [
            {"role": "system", "content": request.system_instruction},
            {"role": "user", "content": request.user_prompt},
        ],
        "temperature": config.temperature,
        "max_tokens": config.max_output_tokens,
    })
}

/// Extract the answer and usage counters from a chat-completions response.
pub fn parse_openai_response(body: &Value) -> std::result::Result<(String, Option<Usage>), String> {
    if let Some(msg) = body["error"]["message"].as_str() {
        return Err(msg.to_string());
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| "response has no choices[0].message.content".to_string())?;

    if content.trim().is_empty() {
        return Err("provider returned an empty completion".into());
    }

    let usage = body.get("usage").filter(|u| u.is_object()).map(|u| Usage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    });

    Ok((content.to_string(), usage))
}

#[async_trait]
impl LlmClient for OpenAICompatClient {
    fn provider(&self) -> &str {
        &self.config.identifier
    }

    fn model(&self) -> &str {
        &self.config.model_name
    }

    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        let body = openai_body(&self.config, request);
        debug!("Requesting {} with model {}", self.url, self.config.model_name);

        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.config.credential))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generation(self.provider(), format!("Request failed: {}", e)))?;

        let parsed = read_json(self.provider(), response).await?;
        let (text, usage) =
            parse_openai_response(&parsed).map_err(|e| Error::generation(self.provider(), e))?;

        if let Some(u) = usage {
            debug!(
                "[{}] tokens: input={} output={} total={}",
                self.provider(),
                u.prompt_tokens,
                u.completion_tokens,
                u.total_tokens
            );
        }

        Ok(text)
    }
}

// ---------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------

pub struct GeminiClient {
    http: Client,
    config: ProviderConfig,
    url: String,
}

impl GeminiClient {
    pub fn new(http: Client, config: ProviderConfig) -> Self {
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model_name
        );
        Self { http, config, url }
    }
}

/// Request body for `generateContent`. The system instruction never enters `contents`.
pub fn gemini_body(config: &ProviderConfig, request: &LlmRequest) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{"text": request.system_instruction}],
        },
        "contents": [
            {"role": "user", "parts": [{"text": request.user_prompt}]},
        ],
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens,
        },
    })
}

/// Extract the answer and usage counters from a `generateContent` response.
pub fn parse_gemini_response(body: &Value) -> std::result::Result<(String, Option<Usage>), String> {
    if let Some(msg) = body["error"]["message"].as_str() {
        return Err(msg.to_string());
    }

    let parts = match body["candidates"][0]["content"]["parts"].as_array() {
        Some(parts) => parts,
        None => {
            return Err(match body["promptFeedback"]["blockReason"].as_str() {
                Some(reason) => format!("prompt blocked: {}", reason),
                None => "response has no candidates".to_string(),
            });
        }
    };

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        let reason = body["candidates"][0]["finishReason"].as_str().unwrap_or("unknown");
        return Err(format!("empty candidate (finishReason: {})", reason));
    }

    let usage = body.get("usageMetadata").filter(|u| u.is_object()).map(|u| Usage {
        prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0),
        completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0),
        total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0),
    });

    Ok((text, usage))
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        &self.config.identifier
    }

    fn model(&self) -> &str {
        &self.config.model_name
    }

    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        let body = gemini_body(&self.config, request);
        debug!("Requesting Gemini with model {}", self.config.model_name);

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.config.credential)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generation(self.provider(), format!("Request failed: {}", e)))?;

        let parsed = read_json(self.provider(), response).await?;
        let (text, usage) =
            parse_gemini_response(&parsed).map_err(|e| Error::generation(self.provider(), e))?;

        if let Some(u) = usage {
            debug!(
                "[{}] tokens: input={} output={} total={}",
                self.provider(),
                u.prompt_tokens,
                u.completion_tokens,
                u.total_tokens
            );
        }

        Ok(text)
    }
}

async fn read_json(provider: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::generation(provider, format!("API error {}: {}", status, body)));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| Error::generation(provider, format!("Malformed response: {}", e)))
}
