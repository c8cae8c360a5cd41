use thiserror::Error;

use crate::models::{Category, Metadata, Platform, ResolutionResult};

const TERMINAL_ANSWER: &str = "Sorry, I couldn't answer that right now. There seems to be a \
                               configuration or connectivity problem with the AI service. \
                               Please try again later.";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("LLM rate limited: {0}")]
    RateLimited(String),

    #[error("LLM still rate limited after {attempts} attempts")]
    RetriesExhausted { attempts: usize },

    #[error("LLM service unreachable: {0}")]
    Unreachable(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Malformed LLM response: {0}")]
    Malformed(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssistantError {
    /// Only rate limiting is worth waiting out.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::RateLimited(_))
    }

    /// Failures that degrade to the local document store instead of surfacing.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            AssistantError::RetriesExhausted { .. }
                | AssistantError::Unreachable(_)
                | AssistantError::MissingCredential(_)
        )
    }

    /// HTTP status used when this error reaches the API layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AssistantError::Storage(_)
            | AssistantError::Config(_)
            | AssistantError::Io(_) => 500,
            _ => 400,
        }
    }

    /// User-facing shape for a terminal resolver failure. The cause itself is
    /// left out of the answer; callers log it.
    pub fn terminal_resolution(&self) -> ResolutionResult {
        ResolutionResult {
            answer: TERMINAL_ANSWER.to_string(),
            metadata: Metadata {
                platform: Some(Platform::None),
                confidence: 0.1,
                category: Category::Error,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AssistantError::RateLimited("429".into()).is_retryable());
        assert!(!AssistantError::Unreachable("down".into()).is_retryable());

        assert!(AssistantError::RetriesExhausted { attempts: 3 }.is_fallback_eligible());
        assert!(AssistantError::MissingCredential("OPENAI_API_KEY".into()).is_fallback_eligible());
        assert!(!AssistantError::Malformed("bad json".into()).is_fallback_eligible());
        assert!(!AssistantError::EmptyResponse.is_fallback_eligible());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AssistantError::Validation("empty".into()).status_code(), 400);
        assert_eq!(AssistantError::Llm("bad request".into()).status_code(), 400);
        assert_eq!(AssistantError::Storage("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_terminal_resolution_shape() {
        let result = AssistantError::Malformed("expected value".into()).terminal_resolution();
        assert_eq!(result.metadata.category, Category::Error);
        assert_eq!(result.metadata.platform, Some(Platform::None));
        assert!((result.metadata.confidence - 0.1).abs() < f64::EPSILON);
        assert!(result.answer.contains("configuration or connectivity"));
        assert!(!result.answer.contains("expected value"));
    }
}
