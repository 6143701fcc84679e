//! HTTP handlers.

use super::types::*;
use super::AppState;
use crate::config::APP_NAME;
use crate::error::RelayError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Welcome to the {} API", APP_NAME),
        version: env!("CARGO_PKG_VERSION"),
        docs_url: "/api/health",
    })
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let rate = state.currency.get_rate(false).await;

    let models = state
        .catalog
        .list_models()
        .into_iter()
        .map(|info| ModelEntry {
            pricing_eur: info.pricing.scaled(rate),
            info,
        })
        .collect();

    Json(ModelsResponse {
        models,
        usd_to_eur_rate: rate,
        rate_updated_at: state.currency.last_update(),
    })
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, RelayError> {
    let Json(request) = payload.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;

    if request.message.trim().is_empty() {
        return Err(RelayError::InvalidRequest("message must not be empty".to_string()));
    }

    let model_id = request.requested_model().map(String::from);
    if let Some(id) = model_id.as_deref() {
        if !state.catalog.contains(id) {
            return Err(RelayError::UnknownModel(id.to_string()));
        }
    }

    let mut history = request.conversation_history.unwrap_or_default();
    let reply = state
        .forwarder
        .send_message(&request.message, &mut history, model_id.as_deref())
        .await
        .inspect_err(|e| tracing::error!("Chat request failed: {}", e))?;

    let cost = match (reply.token_usage, state.catalog.get_model(&reply.model_used)) {
        (Some(usage), Some(model)) => {
            let rate = state.currency.get_rate(false).await;
            Some(model.pricing.cost_of(&usage).to_eur(rate))
        }
        _ => None,
    };

    Ok(Json(ChatResponse {
        response: reply.response,
        conversation_history: history,
        token_usage: reply.token_usage,
        model_used: reply.model_used,
        cost,
    }))
}
