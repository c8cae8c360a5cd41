//! Answer resolution
//!
//! Remote LLM first, rate-limit retries with backoff, then the local document
//! store when the service cannot be used. Every successful path ends in the
//! same `ResolutionResult` shape.

use crate::document_store::{
    document_store, mentioned_feature, DocumentStore, TopicCategory, DOCUMENTATION_LINKS,
};
use crate::error::{AssistantError, Result};
use crate::llm::{LlmBackend, LlmRequest};
use crate::models::{clamp_confidence, Category, Metadata, Platform, ResolutionResult};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = r#"You are a helpful CDP support assistant that helps users with questions about Segment, mParticle, Lytics, and Zeotap.
Answer questions accurately and concisely. If a question is not related to these CDPs, politely explain that you can only help with CDP-related questions.
Always structure your response as a JSON object with the following format:
{
  "answer": "Your detailed answer here",
  "metadata": {
    "platform": "segment|mparticle|lytics|zeotap|multiple|none",
    "confidence": 0.0-1.0,
    "category": "how-to|comparison|general|irrelevant"
  }
}"#;

/// Words that turn a fallback lookup into a cross-platform comparison.
pub const COMPARISON_TRIGGERS: [&str; 5] = ["compare", "difference", "versus", "vs", "better"];

pub const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer: String,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    platform: Option<String>,
    confidence: Option<f64>,
    category: Option<String>,
}

/// Parse and normalise the structured body returned by the LLM.
pub fn parse_answer(content: &str) -> Result<ResolutionResult> {
    if content.trim().is_empty() {
        return Err(AssistantError::EmptyResponse);
    }

    let raw: RawAnswer = serde_json::from_str(content)
        .map_err(|e| AssistantError::Malformed(format!("Failed to parse LLM answer: {}", e)))?;

    if raw.answer.trim().is_empty() {
        return Err(AssistantError::EmptyResponse);
    }

    let metadata = Metadata {
        platform: raw.metadata.platform.as_deref().and_then(Platform::parse),
        confidence: clamp_confidence(raw.metadata.confidence.unwrap_or(0.5)),
        category: raw
            .metadata
            .category
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or(Category::General),
    };

    Ok(ResolutionResult {
        answer: raw.answer,
        metadata,
    })
}

pub fn is_comparison_question(question: &str) -> bool {
    let question = question.to_lowercase();
    COMPARISON_TRIGGERS
        .iter()
        .any(|trigger| question.contains(trigger))
}

pub struct AnswerResolver {
    backend: Arc<dyn LlmBackend>,
    retry_policy: RetryPolicy,
    pipeline_timeout: Duration,
    documents: &'static DocumentStore,
}

impl AnswerResolver {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            retry_policy: RetryPolicy::default(),
            pipeline_timeout: DEFAULT_PIPELINE_TIMEOUT,
            documents: document_store(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_pipeline_timeout(mut self, pipeline_timeout: Duration) -> Self {
        self.pipeline_timeout = pipeline_timeout;
        self
    }

    /// Resolve one question.
    ///
    /// Returns `Err` only for terminal failures (malformed or empty LLM output,
    /// rejected requests). Rate-limit exhaustion, an unreachable service and a
    /// rejected credential all degrade to the local fallback.
    pub async fn resolve(&self, question: &str) -> Result<ResolutionResult> {
        info!(question_len = question.len(), "Resolving question");

        let remote = match tokio::time::timeout(
            self.pipeline_timeout,
            self.resolve_remote(question),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AssistantError::Unreachable(format!(
                "no answer within {}s",
                self.pipeline_timeout.as_secs()
            ))),
        };

        match remote {
            Ok(result) => Ok(result),
            Err(e) if e.is_fallback_eligible() => {
                warn!(error = %e, "LLM unavailable, answering from local documentation");
                Ok(self.fallback_answer(question))
            }
            Err(e) => {
                warn!(error = %e, "Terminal resolver failure");
                Err(e)
            }
        }
    }

    async fn resolve_remote(&self, question: &str) -> Result<ResolutionResult> {
        let request = LlmRequest {
            system_instruction: SYSTEM_PROMPT.to_string(),
            user_message: question.to_string(),
            want_structured_output: true,
        };

        let backend = &self.backend;
        let request = &request;
        self.retry_policy
            .retry_with_backoff(
                || async move {
                    let content = backend.complete(request).await?;
                    parse_answer(&content)
                },
                AssistantError::is_retryable,
            )
            .await
    }

    /// Local answer built only from the document store.
    pub fn fallback_answer(&self, question: &str) -> ResolutionResult {
        if is_comparison_question(question) {
            let feature =
                mentioned_feature(&question.to_lowercase()).unwrap_or(TopicCategory::Source);
            debug!(feature = feature.key(), "Answering with a platform comparison");
            let comparison = self.documents.compare_cdps(feature.key());
            return ResolutionResult {
                answer: comparison.content,
                metadata: Metadata::new(
                    comparison.platform,
                    comparison.confidence,
                    Category::Comparison,
                ),
            };
        }

        let found = self.documents.find_relevant_content(question);
        ResolutionResult {
            answer: format!("{}{}", found.content, DOCUMENTATION_LINKS),
            metadata: Metadata::new(found.platform, found.confidence, Category::HowTo),
        }
    }
}
