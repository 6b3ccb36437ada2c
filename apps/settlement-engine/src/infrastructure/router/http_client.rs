//! HTTP liquidity router and price oracle client.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET  /price/{asset}` → `{"asset": "WETH", "price": "4000.5"}`
//! - `POST /quote`   `{"from", "to", "amount_in"}` → `{"expected_out", "route"}`
//! - `POST /execute` `{"from", "to", "amount_in", "min_out", "route", "deadline"}`
//!   → `{"amount_out"}`
//!
//! Decimal values travel as strings. Reads are retried with backoff;
//! `execute` is sent exactly once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::retry::{Backoff, RetryPolicy, is_retryable};
use crate::application::ports::{
    LiquidityRouterPort, OracleError, PriceOraclePort, RouterError, SwapExecution,
};
use crate::domain::settlement::RouteQuote;
use crate::domain::shared::{Amount, AssetId, Price};

/// Connection settings for the router service.
#[derive(Debug, Clone)]
pub struct HttpRouterConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for `price` and `quote`.
    pub retry: RetryPolicy,
}

impl HttpRouterConfig {
    /// Config with default timeout and retry policy.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Serialize)]
struct QuoteRequest<'a> {
    from: &'a AssetId,
    to: &'a AssetId,
    amount_in: Amount,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    expected_out: Amount,
    route: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    amount_out: Amount,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// Failure of a single request, before mapping to a port error.
#[derive(Debug)]
enum CallError {
    Network(String),
    Status(StatusCode, String),
    Decode(String),
}

impl From<CallError> for RouterError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Network(message) => Self::Unavailable { message },
            CallError::Status(status, message) if status.is_server_error() => Self::Unavailable {
                message: format!("{status}: {message}"),
            },
            CallError::Status(status, message) => Self::Rejected {
                message: format!("{status}: {message}"),
            },
            CallError::Decode(message) => Self::InvalidResponse { message },
        }
    }
}

/// HTTP adapter for both the liquidity router and the price oracle.
#[derive(Debug, Clone)]
pub struct HttpLiquidityRouter {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpLiquidityRouter {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the HTTP client cannot be constructed.
    pub fn new(config: &HttpRouterConfig) -> Result<Self, RouterError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RouterError::Unavailable {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            retry: config.retry.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn read<T, F>(&self, what: &str, build: F) -> Result<T, CallError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut backoff = Backoff::new(&self.retry);
        loop {
            let err = match send(build()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let retryable = match &err {
                CallError::Network(_) => true,
                CallError::Status(status, _) => is_retryable(*status),
                CallError::Decode(_) => false,
            };
            let delay = if retryable { backoff.next_backoff() } else { None };
            let Some(delay) = delay else {
                return Err(err);
            };
            tracing::warn!(
                request = what,
                error = ?err,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Router read failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, CallError> {
    let response = request
        .send()
        .await
        .map_err(|e| CallError::Network(e.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CallError::Network(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(CallError::Status(status, message));
    }
    serde_json::from_str(&body).map_err(|e| CallError::Decode(e.to_string()))
}

#[async_trait]
impl LiquidityRouterPort for HttpLiquidityRouter {
    async fn quote(
        &self,
        from: &AssetId,
        to: &AssetId,
        amount: Amount,
    ) -> Result<RouteQuote, RouterError> {
        let url = self.url("/quote");
        let body = QuoteRequest {
            from,
            to,
            amount_in: amount,
        };
        let response: QuoteResponse = self
            .read("quote", || self.client.post(&url).json(&body))
            .await?;
        Ok(RouteQuote {
            expected_out: response.expected_out,
            route: response.route,
        })
    }

    async fn execute(&self, swap: SwapExecution) -> Result<Amount, RouterError> {
        let request = self.client.post(self.url("/execute")).json(&swap);
        let response: ExecuteResponse = send(request).await?;
        tracing::debug!(
            from = %swap.from,
            to = %swap.to,
            amount_in = %swap.amount_in,
            amount_out = %response.amount_out,
            "Router executed swap"
        );
        Ok(response.amount_out)
    }
}

#[async_trait]
impl PriceOraclePort for HttpLiquidityRouter {
    async fn price(&self, asset: &AssetId) -> Result<Price, OracleError> {
        let url = self.url(&format!("/price/{asset}"));
        let response: PriceResponse = self
            .read("price", || self.client.get(&url))
            .await
            .map_err(|e| match e {
                CallError::Status(StatusCode::NOT_FOUND, _) => OracleError::UnknownAsset {
                    asset: asset.clone(),
                },
                CallError::Decode(message) => OracleError::InvalidPrice { message },
                other => OracleError::Unavailable {
                    message: RouterError::from(other).to_string(),
                },
            })?;
        Price::positive(response.price).map_err(|e| OracleError::InvalidPrice {
            message: e.to_string(),
        })
    }
}
