//! Detail extraction: free-text task input to structured task fields.
//!
//! # Flow
//! 1. Build a prompt embedding today's date and the known category labels
//! 2. Send one request to the completion service (no retry)
//! 3. Decode the reply into a lenient typed schema
//! 4. Normalize: due date future-shift, priority/duration/category defaults
//!
//! Any failure in steps 2-3 fails the whole extraction; callers substitute
//! `TaskDetails::fallback`.

mod error;
pub mod normalize;
pub mod prompt;

pub use error::ExtractError;
pub use normalize::{decode_response, normalize_due_date, RawTaskDetails};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::llm::{ChatMessage, ChatOptions, LlmClient};
use crate::task::{TaskPatch, DEFAULT_DURATION};

/// Output budget for the extraction reply.
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Output budget for a duration-only estimate.
const DURATION_MAX_TOKENS: u64 = 100;

/// Structured fields derived from task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    /// Always set by a successful extraction; `None` only in the fallback.
    pub priority: Option<crate::task::Priority>,
    pub duration: String,
    pub categories: Vec<String>,
}

impl TaskDetails {
    /// Safe record used when extraction fails.
    ///
    /// Keeps the original title, clears the due date and categories, and
    /// leaves priority to whatever the task already has.
    pub fn fallback(original_title: &str, default_duration: &str) -> Self {
        Self {
            title: original_title.to_string(),
            due_date: None,
            priority: None,
            duration: default_duration.to_string(),
            categories: Vec::new(),
        }
    }

    /// Express these details as a store patch.
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title),
            due_date: Some(self.due_date),
            duration: Some(self.duration),
            priority: self.priority,
            categories: Some(self.categories),
        }
    }
}

/// Turns task text into `TaskDetails` through a completion service.
pub struct DetailExtractor {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u64,
    default_duration: String,
}

impl DetailExtractor {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            default_duration: DEFAULT_DURATION.to_string(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_default_duration(mut self, duration: impl Into<String>) -> Self {
        self.default_duration = duration.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn default_duration(&self) -> &str {
        &self.default_duration
    }

    /// Extract structured details from `text`.
    pub async fn extract(
        &self,
        text: &str,
        known_categories: &[String],
        now: DateTime<Utc>,
    ) -> Result<TaskDetails, ExtractError> {
        let prompt = prompt::extraction_prompt(text, known_categories, now);
        let reply = self.complete(prompt, self.max_tokens).await?;
        let raw = decode_response(&reply)?;
        let details = normalize::normalize(raw, text, &self.default_duration, now);

        tracing::debug!(
            priority = ?details.priority,
            has_due_date = details.due_date.is_some(),
            categories = details.categories.len(),
            "Extracted task details"
        );
        Ok(details)
    }

    /// Estimate only a duration for `title`.
    ///
    /// Never fails: an empty reply or any error yields the default duration.
    pub async fn estimate_duration(&self, title: &str) -> String {
        let reply = self
            .complete(prompt::duration_prompt(title), DURATION_MAX_TOKENS)
            .await;
        match reply {
            Ok(text) => {
                let estimate = text.trim().trim_matches('"').trim();
                if estimate.is_empty() {
                    self.default_duration.clone()
                } else {
                    estimate.to_string()
                }
            }
            Err(e) => {
                tracing::warn!("Duration estimate failed, using default: {}", e);
                self.default_duration.clone()
            }
        }
    }

    async fn complete(&self, prompt: String, max_tokens: u64) -> Result<String, ExtractError> {
        let options = ChatOptions {
            max_tokens: Some(max_tokens),
            ..ChatOptions::default()
        };
        let response = self
            .client
            .chat_completion_with_options(&self.model, &[ChatMessage::user(prompt)], options)
            .await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }
        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(ExtractError::EmptyResponse)
    }
}
