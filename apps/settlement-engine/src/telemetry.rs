//! Tracing Setup
//!
//! Console logging through `tracing-subscriber`, optionally exported to an
//! OTLP collector.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (default: `info,settlement_engine=<log_level>`)
//! - `OTEL_ENABLED`: set to `true` to export spans over OTLP
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (default: `http://localhost:4317`)
//! - `OTEL_SERVICE_NAME`: service name for traces (default: `settlement-engine`)

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Install the global tracing subscriber.
///
/// Returns a guard that flushes and shuts down the OTLP exporter, if any,
/// when dropped. A subscriber that is already installed is left in place.
#[must_use]
pub fn init_telemetry(config: &ObservabilityConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,settlement_engine={}", config.log_level)));

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    let otel_enabled = std::env::var("OTEL_ENABLED").is_ok_and(|v| v == "true");
    if !otel_enabled {
        if let Err(e) = subscriber.try_init() {
            eprintln!("Tracing subscriber already installed: {e}");
        }
        return TelemetryGuard { provider: None };
    }

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "settlement-engine".to_string());

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
            if let Err(e) = subscriber.try_init() {
                eprintln!("Tracing subscriber already installed: {e}");
            }
            return TelemetryGuard { provider: None };
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer(service_name.clone());

    if let Err(e) = subscriber
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
    {
        eprintln!("Tracing subscriber already installed: {e}");
    }

    tracing::info!(
        service_name = %service_name,
        endpoint = %endpoint,
        "OpenTelemetry initialized"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}
