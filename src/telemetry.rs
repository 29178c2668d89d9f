use std::sync::Mutex;

use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use tonic::metadata::MetadataMap;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

fn resource() -> Resource {
    let deployment_environment =
        std::env::var("APP_PROFILE").unwrap_or_else(|_| "development".to_string());

    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_environment),
            ],
            SCHEMA_URL,
        )
        .build()
}

// Construct TracerProvider for OpenTelemetryLayer
fn init_tracer_provider(endpoint: &str) -> Result<SdkTracerProvider, AppError> {
    let mut metadata = MetadataMap::new();
    if let Ok(api_key) = std::env::var("HONEYCOMB_API_KEY") {
        let value = api_key.parse().map_err(|_| {
            AppError::Internal("Invalid HONEYCOMB_API_KEY header value".to_string())
        })?;
        metadata.insert("x-honeycomb-team", value);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots())
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build span exporter: {}", e)))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build();

    Ok(tracer_provider)
}

/// Installs the global subscriber: fmt output filtered by `RUST_LOG`, plus an
/// OTLP span export layer when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_tracing() -> Result<(), AppError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => {
            let tracer_provider = init_tracer_provider(&endpoint)?;
            let tracer = tracer_provider.tracer("attendance-tracker");

            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(OpenTelemetryLayer::new(tracer))
                .init();

            *TELEMETRY_GUARD.lock().unwrap() = Some(OtelGuard { tracer_provider });
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

pub fn shutdown_telemetry() {
    let guard = TELEMETRY_GUARD.lock().unwrap().take();
    drop(guard); // This will trigger the Drop impl and shutdown
}
