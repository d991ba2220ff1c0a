//! External product lookup.
//!
//! The lookup source is best-effort by contract: callers wrap it in
//! [`RetryingLookup`] for a bounded retry budget, and the aggregator
//! degrades any remaining failure to an empty result set.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use procura_core::config::LookupConfig;
use procura_core::domain::product::{Product, ProductId};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("lookup response could not be decoded: {0}")]
    Decode(String),
    #[error("lookup failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Look up candidates for `item` priced within `budget`.
    async fn search(&self, item: &str, budget: f64) -> Result<Vec<Product>, SourceError>;
}

/// Disabled-lookup stand-in: always returns an empty result set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookupSource;

#[async_trait]
impl ExternalSource for NoopLookupSource {
    async fn search(&self, _item: &str, _budget: f64) -> Result<Vec<Product>, SourceError> {
        Ok(Vec::new())
    }
}

/// Wire shape of one externally-listed product. Sources are not required
/// to supply an id; the aggregator backfills missing ones.
#[derive(Debug, Deserialize)]
struct LookupItem {
    title: String,
    price: f64,
    link: String,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    availability: Option<String>,
    #[serde(default)]
    delivery_time: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl LookupItem {
    fn into_product(self) -> Product {
        Product {
            id: ProductId(self.product_id.unwrap_or_default()),
            title: self.title,
            price: self.price,
            description: self.description.unwrap_or_else(|| "From external lookup".to_owned()),
            availability: self.availability.unwrap_or_else(|| "Check site".to_owned()),
            delivery_time: self.delivery_time.unwrap_or_else(|| "Varies".to_owned()),
            category: self.category.unwrap_or_else(|| "External".to_owned()),
            link: self.link,
        }
    }
}

/// HTTP lookup client with a per-attempt timeout.
pub struct HttpLookupSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupSource {
    pub fn new(config: &LookupConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl ExternalSource for HttpLookupSource {
    async fn search(&self, item: &str, budget: f64) -> Result<Vec<Product>, SourceError> {
        let url = format!("{}/search", self.base_url);
        let max_price = budget.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("q", item), ("max_price", max_price.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let items = response
            .json::<Vec<LookupItem>>()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;

        // Sources are not trusted to honor the budget bound.
        Ok(items
            .into_iter()
            .map(LookupItem::into_product)
            .filter(|product| product.price <= budget)
            .collect())
    }
}

/// Retry budget for a transient-failure-prone source: the delay doubles
/// after every failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Bounded-retry wrapper around any [`ExternalSource`].
pub struct RetryingLookup<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingLookup<S>
where
    S: ExternalSource,
{
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S> ExternalSource for RetryingLookup<S>
where
    S: ExternalSource,
{
    async fn search(&self, item: &str, budget: f64) -> Result<Vec<Product>, SourceError> {
        let mut last_error = String::new();

        for attempt in 0..self.policy.max_attempts {
            match self.inner.search(item, budget).await {
                Ok(products) => return Ok(products),
                Err(error) => {
                    last_error = error.to_string();
                    warn!(
                        event_name = "lookup.attempt_failed",
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        error = %last_error,
                        "external lookup attempt failed"
                    );

                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        Err(SourceError::RetriesExhausted { attempts: self.policy.max_attempts, last_error })
    }
}
