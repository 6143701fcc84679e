//! Request and response types for the HTTP API.

use crate::catalog::{ModelInfo, ModelPricing, TurnCost};
use crate::claude::{Message, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: &'static str,
    pub docs_url: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelEntry>,
    pub usd_to_eur_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_updated_at: Option<DateTime<Utc>>,
}

/// Catalog entry with its pricing converted to EUR.
#[derive(Serialize)]
pub struct ModelEntry {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub pricing_eur: ModelPricing,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Option<Vec<Message>>,
    #[serde(default, alias = "modelId")]
    pub model_id: Option<String>,
}

impl ChatRequest {
    /// Requested model, treating an empty string as "not specified".
    pub fn requested_model(&self) -> Option<&str> {
        self.model_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<TurnCost>,
}
