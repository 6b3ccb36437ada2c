//! Prometheus metrics for the settlement engine.
//!
//! Recorded through the `metrics` facade; without an installed exporter
//! every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use std::net::{Ipv4Addr, SocketAddr};

use crate::domain::shared::{Amount, AssetId};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for router latency (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // 5ms to 30s
            latency_buckets: vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

fn as_f64(amount: Amount) -> f64 {
    amount.value().to_f64().unwrap_or(0.0)
}

// ============================================================================
// Lifecycle Metrics
// ============================================================================

/// Record a successful take.
pub fn record_option_taken(asset: &AssetId, option_type: &str, commitment_type: &str) {
    counter!(
        "options_taken_total",
        "asset" => asset.to_string(),
        "option_type" => option_type.to_string(),
        "commitment_type" => commitment_type.to_string()
    )
    .increment(1);
}

/// Record a successful exercise.
pub fn record_option_exercised(asset: &AssetId, option_type: &str) {
    counter!(
        "options_exercised_total",
        "asset" => asset.to_string(),
        "option_type" => option_type.to_string()
    )
    .increment(1);
}

/// Record a liquidation.
///
/// * `branch` - `returned_to_lp` or `forced_settlement`
pub fn record_option_expired(asset: &AssetId, branch: &str) {
    counter!(
        "options_expired_total",
        "asset" => asset.to_string(),
        "branch" => branch.to_string()
    )
    .increment(1);
}

/// Record a rejected operation.
///
/// * `operation` - `take`, `exercise`, `liquidate`, ...
/// * `code` - error reason string
pub fn record_operation_rejected(operation: &str, code: &str) {
    counter!(
        "operations_rejected_total",
        "operation" => operation.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

// ============================================================================
// Settlement Metrics
// ============================================================================

/// Record a settlement that failed after planning.
pub fn record_settlement_failure(reason: &str) {
    counter!(
        "settlement_failures_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record revenue credited to the protocol account.
pub fn record_protocol_revenue(asset: &AssetId, amount: Amount) {
    gauge!(
        "protocol_revenue_total",
        "asset" => asset.to_string()
    )
    .increment(as_f64(amount));
}

/// Record a router call and its latency.
///
/// * `call` - `quote` or `execute`
/// * `outcome` - `ok`, `error`, `timeout`
pub fn record_router_call(call: &str, outcome: &str, latency_seconds: f64) {
    counter!(
        "router_calls_total",
        "call" => call.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "router_latency_seconds",
        "call" => call.to_string()
    )
    .record(latency_seconds);
}

// ============================================================================
// Collateral Metrics
// ============================================================================

/// Update the locked collateral gauge for an asset.
pub fn update_locked_collateral(asset: &AssetId, total_locked: Amount) {
    gauge!(
        "locked_collateral",
        "asset" => asset.to_string()
    )
    .set(as_f64(total_locked));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn recording_without_exporter_is_noop() {
        let asset = AssetId::new("WETH");
        record_option_taken(&asset, "CALL", "OFFER");
        record_option_expired(&asset, "returned_to_lp");
        record_protocol_revenue(&AssetId::new("USDC"), Amount::new(dec!(0.2)));
        update_locked_collateral(&asset, Amount::new(dec!(1.5)));
        record_router_call("quote", "ok", 0.01);
    }
}
