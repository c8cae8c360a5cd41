//! Message history storage
//!
//! `MemStorage` keeps the history in memory. With a journal configured, each
//! created message is also appended to a JSON-lines file and replayed on startup.

use crate::error::{AssistantError, Result};
use crate::models::{Message, NewMessage, ResolutionResult};
use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[async_trait]
pub trait MessageStorage: Send + Sync {
    async fn create_message(
        &self,
        message: NewMessage,
        resolution: ResolutionResult,
    ) -> Result<Message>;
    async fn get_messages(&self) -> Result<Vec<Message>>;
}

struct History {
    messages: Vec<Message>,
    next_id: u64,
}

pub struct MemStorage {
    history: RwLock<History>,
    journal: Option<PathBuf>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            history: RwLock::new(History {
                messages: Vec::new(),
                next_id: 1,
            }),
            journal: None,
        }
    }

    /// Replay `path` if it exists and append every new message to it.
    pub fn open_journal(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let messages = if path.exists() {
            replay_journal(&path)?
        } else {
            Vec::new()
        };
        let next_id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;

        info!(
            path = %path.display(),
            replayed = messages.len(),
            "Message journal opened"
        );

        Ok(Self {
            history: RwLock::new(History { messages, next_id }),
            journal: Some(path),
        })
    }

    async fn append_to_journal(&self, message: &Message) -> Result<()> {
        let Some(ref path) = self.journal else {
            return Ok(());
        };

        let mut line = serde_json::to_string(message)
            .map_err(|e| AssistantError::Storage(format!("Failed to serialize message: {}", e)))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                AssistantError::Storage(format!(
                    "Failed to open journal {}: {}",
                    path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AssistantError::Storage(format!("Failed to write journal: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| AssistantError::Storage(format!("Failed to flush journal: {}", e)))?;
        Ok(())
    }
}

fn replay_journal(path: &Path) -> Result<Vec<Message>> {
    let file = fs::File::open(path).map_err(|e| {
        AssistantError::Storage(format!("Failed to open journal {}: {}", path.display(), e))
    })?;

    let mut messages = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .map_err(|e| AssistantError::Storage(format!("Failed to read journal: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(&line).map_err(|e| {
            AssistantError::Storage(format!("Corrupt journal line {}: {}", index + 1, e))
        })?;
        messages.push(message);
    }
    Ok(messages)
}

#[async_trait]
impl MessageStorage for MemStorage {
    async fn create_message(
        &self,
        message: NewMessage,
        resolution: ResolutionResult,
    ) -> Result<Message> {
        // Id assignment, journal append and push happen under one write lock.
        let mut history = self.history.write().await;

        let created = Message {
            id: history.next_id,
            question: message.question,
            answer: resolution.answer,
            metadata: resolution.metadata,
            created_at: Utc::now(),
        };

        self.append_to_journal(&created).await?;

        history.next_id += 1;
        history.messages.push(created.clone());
        debug!(id = created.id, "Message stored");

        Ok(created)
    }

    async fn get_messages(&self) -> Result<Vec<Message>> {
        Ok(self.history.read().await.messages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Metadata, Platform};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn resolution(answer: &str) -> ResolutionResult {
        ResolutionResult {
            answer: answer.to_string(),
            metadata: Metadata::new(Platform::Segment, 0.9, Category::HowTo),
        }
    }

    fn question(text: &str) -> NewMessage {
        NewMessage {
            question: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_order_kept() {
        let storage = MemStorage::new();
        let first = storage.create_message(question("one"), resolution("a")).await.unwrap();
        let second = storage.create_message(question("two"), resolution("b")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let all = storage.get_messages().await.unwrap();
        let questions: Vec<_> = all.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(questions, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_ids() {
        let storage = Arc::new(MemStorage::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .create_message(question(&format!("q{}", i)), resolution("a"))
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 50);
        assert_eq!(ids.iter().max(), Some(&50));
    }

    #[tokio::test]
    async fn test_journal_replay_continues_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        {
            let storage = MemStorage::open_journal(&path).unwrap();
            storage.create_message(question("one"), resolution("a")).await.unwrap();
            storage.create_message(question("two"), resolution("b")).await.unwrap();
        }

        let reopened = MemStorage::open_journal(&path).unwrap();
        let replayed = reopened.get_messages().await.unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].answer, "b");

        let third = reopened.create_message(question("three"), resolution("c")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[test]
    fn test_corrupt_journal_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        assert!(matches!(
            MemStorage::open_journal(&path),
            Err(AssistantError::Storage(_))
        ));
    }
}
