//! `OpenTelemetry` metrics initialisation and workflow counters.
//!
//! This module is only compiled when the `metrics` Cargo feature is enabled.
//! It sets up the OTLP exporter for both traces and metrics, sending
//! telemetry to a configurable endpoint (e.g. an `OpenTelemetry` Collector).

use std::sync::OnceLock;

use opentelemetry::metrics::Counter;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Opaque handle that keeps the `OpenTelemetry` providers alive.
///
/// When dropped, the providers are **not** shut down automatically -- call
/// [`MetricsGuard::shutdown`] for a graceful flush before exiting.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Tracer backed by this guard's provider.
    pub fn tracer(&self, name: &'static str) -> SdkTracer {
        self.tracer_provider.tracer(name)
    }

    /// Gracefully shut down both providers, flushing any buffered telemetry.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the `OpenTelemetry` OTLP pipeline for traces **and** metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
///
/// Returns a [`MetricsGuard`] that **must** be kept alive for the lifetime of
/// the application.
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

struct WorkflowCounters {
    transitions: Counter<u64>,
    dispatch_failures: Counter<u64>,
}

fn counters() -> &'static WorkflowCounters {
    static COUNTERS: OnceLock<WorkflowCounters> = OnceLock::new();
    COUNTERS.get_or_init(|| {
        let meter = global::meter("homestay");
        WorkflowCounters {
            transitions: meter
                .u64_counter("homestay.transitions")
                .with_description("Committed lifecycle transitions")
                .build(),
            dispatch_failures: meter
                .u64_counter("homestay.dispatch_failures")
                .with_description("Notifications that could not be delivered")
                .build(),
        }
    })
}

/// Count one committed transition of `entity` into `to`.
pub fn record_transition(entity: &'static str, to: &'static str) {
    counters().transitions.add(
        1,
        &[KeyValue::new("entity", entity), KeyValue::new("to", to)],
    );
}

/// Count one failed notification of the given event kind.
pub fn record_dispatch_failure(kind: &'static str) {
    counters()
        .dispatch_failures
        .add(1, &[KeyValue::new("kind", kind)]);
}
