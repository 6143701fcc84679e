//! Model catalog: the fixed list of Anthropic models offered to clients.
//!
//! Prices are stored in USD per million tokens. EUR figures are derived at
//! display time from the exchange rate cache.

use crate::claude::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Price of a model in currency units per million tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

impl ModelPricing {
    /// Combined input + output unit cost, used for ordering.
    pub fn total(&self) -> f64 {
        self.input + self.output
    }

    /// Same pricing expressed in another currency.
    pub fn scaled(&self, rate: f64) -> Self {
        Self {
            input: self.input * rate,
            output: self.output * rate,
        }
    }

    /// Cost of one exchange, in the pricing's currency.
    pub fn cost_of(&self, usage: &TokenUsage) -> TurnCost {
        let input_cost = usage.input_tokens as f64 / 1_000_000.0 * self.input;
        let output_cost = usage.output_tokens as f64 / 1_000_000.0 * self.output;
        TurnCost {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            currency: "USD".to_string(),
        }
    }
}

/// Price of a single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnCost {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: String,
}

impl TurnCost {
    /// Convert a USD cost into EUR, rounding each figure to six decimals.
    pub fn to_eur(&self, usd_to_eur: f64) -> Self {
        let input_cost = round6(self.input_cost * usd_to_eur);
        let output_cost = round6(self.output_cost * usd_to_eur);
        Self {
            input_cost,
            output_cost,
            total_cost: round6(self.total_cost * usd_to_eur),
            currency: "EUR".to_string(),
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pricing: ModelPricing,
    #[serde(default = "default_current")]
    pub current: bool,
}

fn default_current() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    DuplicateId(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateId(id) => write!(f, "Duplicate model id in catalog: {}", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable model registry, keyed by id.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(models: Vec<ModelInfo>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for model in &models {
            if !seen.insert(model.id.as_str()) {
                return Err(CatalogError::DuplicateId(model.id.clone()));
            }
        }
        Ok(Self { models })
    }

    /// All models, current ones first, then cheapest first.
    ///
    /// The sort is stable: entries that tie keep their configured order.
    pub fn list_models(&self) -> Vec<ModelInfo> {
        let mut sorted = self.models.clone();
        sorted.sort_by(|a, b| {
            b.current
                .cmp(&a.current)
                .then_with(|| a.pricing.total().total_cmp(&b.pricing.total()))
        });
        sorted
    }

    /// Exact-id lookup.
    pub fn get_model(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get_model(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: builtin_models(),
        }
    }
}

fn entry(id: &str, name: &str, description: &str, input: f64, output: f64, current: bool) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        pricing: ModelPricing { input, output },
        current,
    }
}

/// Anthropic models with their list prices in USD per million tokens.
pub fn builtin_models() -> Vec<ModelInfo> {
    vec![
        entry(
            "claude-3-7-sonnet-20250219",
            "Claude 3.7 Sonnet",
            "Most intelligent model, with extended reasoning",
            3.0,
            15.0,
            true,
        ),
        entry(
            "claude-3-5-haiku-20241022",
            "Claude 3.5 Haiku",
            "Fastest current model, for everyday tasks",
            0.8,
            4.0,
            true,
        ),
        entry(
            "claude-3-5-sonnet-20241022",
            "Claude 3.5 Sonnet",
            "Previous flagship, strong at coding",
            3.0,
            15.0,
            false,
        ),
        entry(
            "claude-3-opus-20240229",
            "Claude 3 Opus",
            "Powerful legacy model for complex tasks",
            15.0,
            75.0,
            false,
        ),
        entry(
            "claude-3-haiku-20240307",
            "Claude 3 Haiku",
            "Compact legacy model, cheapest option",
            0.25,
            1.25,
            false,
        ),
    ]
}
