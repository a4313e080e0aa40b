// Copyright 2025 Pubdex (https://github.com/pubdex)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pubdex telemetry (tracing + span export).
//!
//! One JSON log line per event via `tracing-subscriber`; span export is
//! selectable: `NONE` (logs only), `CONSOLE` (stdout span exporter), or
//! `OTLP` (gRPC batch exporter).

use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Span-export selection (`MCP_TELEMETRY_EXPORTER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryExporter {
    #[default]
    None,
    Console,
    Otlp,
}

#[derive(Debug, Error)]
#[error("unknown telemetry exporter '{0}' (expected NONE, CONSOLE, or OTLP)")]
pub struct ExporterParseError(String);

impl FromStr for TelemetryExporter {
    type Err = ExporterParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(TelemetryExporter::None),
            "console" => Ok(TelemetryExporter::Console),
            "otlp" => Ok(TelemetryExporter::Otlp),
            other => Err(ExporterParseError(other.to_string())),
        }
    }
}

/// Initialize tracing for the process.
///
/// `default_level` seeds the env-filter (the `MCP_LOG_LEVEL` value has
/// already been merged into it by configuration loading). The OTLP
/// exporter honors the standard `OTEL_EXPORTER_OTLP_ENDPOINT` variable.
pub fn init(service_name: &str, exporter: &str, default_level: &str) -> anyhow::Result<()> {
    let exporter: TelemetryExporter = exporter.parse()?;
    let filter = EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);

    match exporter {
        TelemetryExporter::None => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
        TelemetryExporter::Console => {
            let provider = opentelemetry_sdk::trace::TracerProvider::builder()
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .build();
            let tracer = provider.tracer(service_name.to_string());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(otel_layer)
                .init();
        }
        TelemetryExporter::Otlp => {
            let provider = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(opentelemetry_otlp::new_exporter().tonic())
                .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![KeyValue::new(
                        "service.name",
                        service_name.to_string(),
                    )]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;
            let tracer = provider.tracer(service_name.to_string());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(otel_layer)
                .init();
        }
    }
    Ok(())
}
