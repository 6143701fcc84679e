//! Chat forwarder for the Anthropic Messages API.
//!
//! Turns a user message plus the caller-held history into one upstream call
//! and, only when that call succeeds, appends the user message and the reply
//! to the history.

mod types;

pub use types::*;

use crate::catalog::ModelCatalog;
use crate::config::{AnthropicConfig, LogVerbosity, DEFAULT_API_URL, DEFAULT_API_VERSION, DEFAULT_MAX_TOKENS};
use crate::error::RelayError;
use crate::http::create_client;
use crate::logger::{format_exchange, ExchangeRecord};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;

/// Longest slice of an unparseable upstream body quoted in errors.
const MAX_QUOTED_BODY: usize = 500;

#[derive(Clone)]
pub struct ChatForwarder {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    api_version: String,
    default_model: String,
    max_tokens: u32,
    catalog: Arc<ModelCatalog>,
    verbosity: LogVerbosity,
}

impl ChatForwarder {
    pub fn new(catalog: Arc<ModelCatalog>, default_model: impl Into<String>) -> Self {
        Self {
            client: create_client(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            default_model: default_model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            catalog,
            verbosity: LogVerbosity::default(),
        }
    }

    pub fn from_config(config: &AnthropicConfig, catalog: Arc<ModelCatalog>) -> Self {
        let mut forwarder = Self::new(catalog, config.default_model.clone())
            .with_api_url(&config.api_url)
            .with_max_tokens(config.max_tokens);
        forwarder.api_version = config.api_version.clone();
        forwarder.api_key = config.api_key.clone();
        forwarder
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The requested model when the catalog knows it, the default otherwise.
    pub fn resolve_model(&self, model_id: Option<&str>) -> String {
        match model_id {
            Some(id) if self.catalog.contains(id) => id.to_string(),
            _ => self.default_model.clone(),
        }
    }

    /// Build the upstream payload: prior turns oldest first, then the new message.
    pub fn build_request<'a>(
        &self,
        message: &'a str,
        history: &'a [Message],
        model: &'a str,
    ) -> UpstreamRequest<'a> {
        let messages = history
            .iter()
            .map(|m| UpstreamMessage {
                role: m.role,
                content: &m.content,
            })
            .chain(std::iter::once(UpstreamMessage {
                role: MessageRole::User,
                content: message,
            }))
            .collect();

        UpstreamRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
        }
    }

    /// Send one chat turn upstream.
    ///
    /// `history` is extended by exactly two messages on success and left
    /// untouched on any error.
    pub async fn send_message(
        &self,
        message: &str,
        history: &mut Vec<Message>,
        model_id: Option<&str>,
    ) -> Result<ChatReply, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::ApiKeyMissing)?;
        let model = self.resolve_model(model_id);
        let payload = self.build_request(message, history, &model);

        let started = Instant::now();
        let mut record = ExchangeRecord {
            method: "POST",
            url: self.api_url.clone(),
            model: model.clone(),
            status: None,
            duration_ms: 0,
            usage: None,
        };

        let sent = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                record.duration_ms = started.elapsed().as_millis() as u64;
                tracing::warn!("{}", format_exchange(&record, self.verbosity));
                return Err(RelayError::UpstreamTransport(e.to_string()));
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RelayError::UpstreamTransport(format!("Failed to read response body: {}", e))
        })?;
        record.status = Some(status.as_u16());
        record.duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::warn!("{}", format_exchange(&record, self.verbosity));
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let (text, token_usage) = parse_reply(&body)?;
        record.usage = token_usage;
        tracing::info!("{}", format_exchange(&record, self.verbosity));

        history.push(Message::user(message));
        history.push(Message::assistant(text.clone(), model.clone()));

        Ok(ChatReply {
            response: text,
            token_usage,
            model_used: model,
        })
    }
}

/// Extract the reply text and usage from a 2xx upstream body.
///
/// An empty `content` array yields an empty reply; a body without a
/// `content` array is an error.
pub fn parse_reply(body: &str) -> Result<(String, Option<TokenUsage>), RelayError> {
    let parsed: UpstreamResponse = serde_json::from_str(body).map_err(|e| {
        let quoted: String = body.chars().take(MAX_QUOTED_BODY).collect();
        RelayError::ParseError(format!("{} | Response: {}", e, quoted))
    })?;

    let text = parsed
        .content
        .into_iter()
        .find_map(|block| block.text)
        .unwrap_or_default();

    Ok((text, parsed.usage.map(TokenUsage::from)))
}
