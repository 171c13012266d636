//! Query refinement: turn a follow-up question into a self-contained search query.
//!
//! Best-effort: any failure of the secondary model falls back to the
//! original question. Only cancellation is propagated.

use std::sync::Arc;
use std::time::Duration;

use healthrag_chat::{ChatTurn, LlmClient, LlmRequest};
use healthrag_core::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::deadline::bounded;

/// Number of most recent turns the rewrite sees.
pub const HISTORY_WINDOW: usize = 4;

const REFINE_INSTRUCTION: &str = "You rewrite follow-up questions into standalone search queries. \
Reply with the rewritten question only, in the language of the question, without any explanation.";

pub struct QueryRefiner {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl QueryRefiner {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn provider(&self) -> &str {
        self.client.provider()
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Rewrite `question` using recent history; empty history returns it as is.
    pub async fn refine(
        &self,
        question: &str,
        history: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let request = LlmRequest::new(REFINE_INSTRUCTION, rewrite_prompt(question, history));
        let rewritten = bounded(
            "refine",
            self.timeout,
            cancel,
            self.client.generate(&request),
        )
        .await;

        match rewritten {
            Ok(text) if !text.trim().is_empty() => {
                let refined = text.trim().to_string();
                debug!("Refined '{}' -> '{}'", question, refined);
                Ok(refined)
            }
            Ok(_) => {
                warn!("Refiner returned an empty rewrite; using the original question");
                Ok(question.to_string())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("Query refinement failed, using the original question: {}", e);
                Ok(question.to_string())
            }
        }
    }
}

/// Rewrite instruction over the last [`HISTORY_WINDOW`] turns, oldest first.
pub fn rewrite_prompt(question: &str, history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let transcript = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Conversation so far:\n{}\n\n\
         Rewrite the follow-up question below so it can be understood without the conversation. \
         Keep every medical detail it refers to.\n\n\
         Follow-up question: {}\n\
         Standalone question:",
        transcript, question
    )
}
