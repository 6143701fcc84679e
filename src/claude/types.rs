//! Conversation types and the Anthropic Messages API wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Upstream model that produced an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            model: None,
        }
    }

    pub fn assistant(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            model: Some(model.into()),
        }
    }
}

/// Token counts reported by the upstream for one exchange.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of a successful chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub token_usage: Option<TokenUsage>,
    pub model_used: String,
}

// ============================================================================
// Upstream wire types
// ============================================================================

#[derive(Debug, Serialize, PartialEq)]
pub struct UpstreamMessage<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<UpstreamMessage<'a>>,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<UpstreamUsage>,
}

/// A reply block; only text blocks carry `text`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl From<UpstreamUsage> for TokenUsage {
    fn from(usage: UpstreamUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}
