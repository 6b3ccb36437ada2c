//! Observability module for metrics.
//!
//! Tracing subscriber setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_option_exercised, record_option_expired,
    record_option_taken, record_operation_rejected, record_protocol_revenue, record_router_call,
    record_settlement_failure, update_locked_collateral,
};
