use crate::error::{AssistantError, Result};
use crate::models::{Message, NewMessage, Platform};
use crate::resolver::AnswerResolver;
use crate::storage::MessageStorage;
use std::sync::Arc;
use tracing::info;

/// Accepts questions, resolves them once, and records the outcome.
pub struct MessageService {
    resolver: AnswerResolver,
    storage: Arc<dyn MessageStorage>,
}

impl MessageService {
    pub fn new(resolver: AnswerResolver, storage: Arc<dyn MessageStorage>) -> Self {
        Self { resolver, storage }
    }

    /// `question` must be present, a string, and not blank.
    pub fn validate(body: &serde_json::Value) -> Result<NewMessage> {
        let question = match body.get("question") {
            Some(serde_json::Value::String(question)) => question,
            Some(_) => {
                return Err(AssistantError::Validation(
                    "question must be a string".to_string(),
                ))
            }
            None => return Err(AssistantError::Validation("question is required".to_string())),
        };
        if question.trim().is_empty() {
            return Err(AssistantError::Validation("question must not be empty".to_string()));
        }
        Ok(NewMessage {
            question: question.clone(),
        })
    }

    /// Validate, resolve and store. Terminal resolver errors store nothing.
    pub async fn submit(&self, body: &serde_json::Value) -> Result<Message> {
        let new_message = Self::validate(body)?;
        let resolution = self.resolver.resolve(&new_message.question).await?;
        let message = self.storage.create_message(new_message, resolution).await?;

        info!(
            id = message.id,
            platform = ?message.metadata.platform,
            category = ?message.metadata.category,
            confidence = message.metadata.confidence,
            "Answered question"
        );
        Ok(message)
    }

    /// History in insertion order, optionally restricted to one platform tag.
    pub async fn list(&self, platform: Option<Platform>) -> Result<Vec<Message>> {
        let messages = self.storage.get_messages().await?;
        Ok(match platform {
            Some(platform) => messages
                .into_iter()
                .filter(|m| m.metadata.platform == Some(platform))
                .collect(),
            None => messages,
        })
    }
}
