//! USD→EUR exchange rate with a once-a-day refresh policy.
//!
//! The cached rate is Fresh for one day after a successful refresh and Stale
//! otherwise. A failed refresh keeps the previous rate and timestamp; callers
//! of [`ExchangeRateCache::get_rate`] never see the failure.

use crate::config::{CurrencyConfig, DEFAULT_RATE_URL, DEFAULT_USD_TO_EUR_RATE};
use crate::error::RateFetchError;
use crate::http::{create_client_with_timeout, RATE_TIMEOUT};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cached rate and the instant it was last refreshed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSnapshot {
    pub rate: f64,
    pub last_update: Option<DateTime<Utc>>,
}

pub struct ExchangeRateCache {
    client: Client,
    rate_url: String,
    clock: Arc<dyn Clock>,
    state: RwLock<RateSnapshot>,
    refresh_guard: Mutex<()>,
}

impl ExchangeRateCache {
    pub fn new(initial_rate: f64) -> Self {
        Self {
            client: create_client_with_timeout(RATE_TIMEOUT),
            rate_url: DEFAULT_RATE_URL.to_string(),
            clock: Arc::new(SystemClock),
            state: RwLock::new(RateSnapshot {
                rate: usable_rate(initial_rate),
                last_update: None,
            }),
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn from_config(config: &CurrencyConfig) -> Self {
        Self::new(config.default_rate).with_rate_url(&config.rate_url)
    }

    pub fn with_rate_url(mut self, url: &str) -> Self {
        self.rate_url = url.to_string();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the cache as if it had been refreshed at `last_update`.
    pub fn with_snapshot(self, rate: f64, last_update: Option<DateTime<Utc>>) -> Self {
        self.store(RateSnapshot {
            rate: usable_rate(rate),
            last_update,
        });
        self
    }

    pub fn snapshot(&self) -> RateSnapshot {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cached_rate(&self) -> f64 {
        self.snapshot().rate
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_update
    }

    /// Fresh means refreshed less than one day ago.
    pub fn is_fresh(&self) -> bool {
        match self.last_update() {
            Some(at) => self.clock.now() - at < Duration::days(1),
            None => false,
        }
    }

    /// Current USD→EUR rate, refreshing first when stale or forced.
    ///
    /// Refreshes are serialized; a caller that waited for another refresh
    /// reuses its result instead of fetching again.
    pub async fn get_rate(&self, force_update: bool) -> f64 {
        if !force_update && self.is_fresh() {
            return self.cached_rate();
        }

        let _guard = self.refresh_guard.lock().await;
        if !force_update && self.is_fresh() {
            return self.cached_rate();
        }

        match self.fetch_and_store().await {
            Ok(rate) => rate,
            Err(e) => {
                let cached = self.cached_rate();
                tracing::warn!("Exchange rate refresh failed, keeping {}: {}", cached, e);
                cached
            }
        }
    }

    /// Force a refresh and report its outcome.
    pub async fn refresh(&self) -> Result<f64, RateFetchError> {
        let _guard = self.refresh_guard.lock().await;
        self.fetch_and_store().await
    }

    /// Convert a USD amount using the current rate.
    pub async fn convert(&self, amount_usd: f64) -> f64 {
        amount_usd * self.get_rate(false).await
    }

    async fn fetch_and_store(&self) -> Result<f64, RateFetchError> {
        let rate = self.fetch_rate().await?;
        self.store(RateSnapshot {
            rate,
            last_update: Some(self.clock.now()),
        });
        tracing::info!("USD/EUR exchange rate updated: {}", rate);
        Ok(rate)
    }

    async fn fetch_rate(&self) -> Result<f64, RateFetchError> {
        let response = self.client.get(&self.rate_url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(RateFetchError::Status(status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| RateFetchError::Malformed(e.to_string()))?;

        parse_eur_rate(&data)
    }

    fn store(&self, snapshot: RateSnapshot) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

impl Default for ExchangeRateCache {
    fn default() -> Self {
        Self::new(DEFAULT_USD_TO_EUR_RATE)
    }
}

/// Read `rates.EUR` from a rate source payload.
pub fn parse_eur_rate(data: &Value) -> Result<f64, RateFetchError> {
    data["rates"]["EUR"]
        .as_f64()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .ok_or_else(|| RateFetchError::Malformed(format!("no positive rates.EUR in {}", data)))
}

fn usable_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        tracing::warn!("Ignoring unusable exchange rate {}, using {}", rate, DEFAULT_USD_TO_EUR_RATE);
        DEFAULT_USD_TO_EUR_RATE
    }
}
