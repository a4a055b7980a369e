use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Completion Trait
// =============================================================================

/// A text-completion backend. Object-safe so callers can hold
/// `Arc<dyn Completion>` and swap providers or test doubles.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Send a conversation and return the assistant's text.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Provider/model label for logs.
    fn model(&self) -> &str;
}
