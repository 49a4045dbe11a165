use anyhow::Result;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "unknown log format '{}', expected 'compact' or 'json'",
                other
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Builds the log filter: `RUST_LOG` wins, otherwise `default_level` applies.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

pub fn init_telemetry(service_name: &'static str, format: LogFormat, default_level: &str) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(json.then(|| tracing_fmt::layer().json()))
        .with((!json).then(|| tracing_fmt::layer().compact()))
        .with(select_tracer(service_name).map(OpenTelemetryLayer::new))
        .init();
}

/// Span export is driven by `OTEL_TRACES_EXPORTER`: `otlp`, `stdout`, or unset for none.
fn select_tracer(service_name: &'static str) -> Option<opentelemetry_sdk::trace::Tracer> {
    match env::var("OTEL_TRACES_EXPORTER").ok().as_deref() {
        Some("otlp") => {
            let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4318/v1/traces".to_string());

            match create_otlp_tracer(&otlp_endpoint, service_name) {
                Ok(tracer) => Some(tracer),
                // the subscriber is not up yet, so this goes straight to stderr
                Err(e) => {
                    eprintln!("{}: otlp span export unavailable ({}), using stdout", service_name, e);
                    Some(init_stdout_tracer(service_name))
                }
            }
        }
        Some("stdout") | Some("console") => Some(init_stdout_tracer(service_name)),
        _ => None,
    }
}

fn create_otlp_tracer(
    endpoint: &str,
    service_name: &'static str,
) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry_otlp::WithExportConfig;

    // Only the HTTP transport is wired up.
    if !(endpoint.contains("4318") || endpoint.contains("/v1/traces")) {
        return Err(anyhow::anyhow!(
            "gRPC OTLP endpoint {} not supported, use the HTTP endpoint (port 4318)",
            endpoint
        ));
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_simple_exporter(exporter)
        .build();

    Ok(provider.tracer(service_name))
}

fn init_stdout_tracer(service_name: &'static str) -> opentelemetry_sdk::trace::Tracer {
    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();

    provider.tracer(service_name)
}
