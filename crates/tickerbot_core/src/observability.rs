//! Metrics export.
//!
//! The report job records through `opentelemetry::global`. This module picks
//! where those measurements go. Until [`init_metrics`] installs a provider, or
//! when the exporter is [`MetricsExporter::None`], every instrument is a no-op.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tickerbot_error::ConfigError;
use tracing::{info, instrument, warn};

#[cfg(feature = "metrics")]
use opentelemetry::{KeyValue, global};
#[cfg(feature = "metrics")]
use opentelemetry_otlp::{MetricExporter as OtlpExporter, WithExportConfig};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
#[cfg(feature = "metrics")]
use std::time::Duration;

/// OTLP/HTTP metrics endpoint of a collector on the local host.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318/v1/metrics";

/// Where measurements are exported.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricsExporter {
    /// Instruments stay no-ops
    #[default]
    None,
    /// Periodic dump to stdout
    Stdout,
    /// Push to an OTLP/HTTP collector
    Otlp,
}

/// `[metrics]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MetricsConfig {
    /// Export target
    #[serde(default)]
    exporter: MetricsExporter,
    /// Collector URL, used by [`MetricsExporter::Otlp`]
    #[serde(default = "default_otlp_endpoint")]
    otlp_endpoint: String,
    /// Seconds between exports
    #[serde(default = "default_export_interval_secs")]
    export_interval_secs: u64,
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_export_interval_secs() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self::new(MetricsExporter::None, DEFAULT_OTLP_ENDPOINT, 60)
    }
}

impl MetricsConfig {
    /// Creates a configuration.
    pub fn new(
        exporter: MetricsExporter,
        otlp_endpoint: impl Into<String>,
        export_interval_secs: u64,
    ) -> Self {
        Self {
            exporter,
            otlp_endpoint: otlp_endpoint.into(),
            export_interval_secs,
        }
    }

    /// Check the interval and, for OTLP, the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero interval or a blank OTLP endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export_interval_secs == 0 {
            return Err(ConfigError::new(
                "metrics.export_interval_secs must be positive",
            ));
        }
        if self.exporter == MetricsExporter::Otlp && self.otlp_endpoint.trim().is_empty() {
            return Err(ConfigError::new(
                "metrics.otlp_endpoint is required for the otlp exporter",
            ));
        }
        Ok(())
    }
}

/// Keeps the installed meter provider; [`MetricsGuard::shutdown`] flushes it.
#[derive(Debug, Default)]
pub struct MetricsGuard {
    #[cfg(feature = "metrics")]
    provider: Option<SdkMeterProvider>,
}

impl MetricsGuard {
    /// Whether a provider was installed.
    #[cfg(feature = "metrics")]
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether a provider was installed.
    #[cfg(not(feature = "metrics"))]
    pub fn is_exporting(&self) -> bool {
        false
    }

    /// Export what is pending and stop the provider.
    #[cfg(feature = "metrics")]
    #[instrument(skip(self))]
    pub fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };
        match provider.shutdown() {
            Ok(()) => info!("Metrics provider shut down"),
            Err(e) => warn!(error = %e, "Metrics provider shutdown failed"),
        }
    }

    /// Export what is pending and stop the provider.
    #[cfg(not(feature = "metrics"))]
    pub fn shutdown(self) {}
}

/// Install the global meter provider described by `config`.
///
/// The provider's resource carries `service.name` and the crate version.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the OTLP exporter cannot be built.
#[instrument(skip(config), fields(exporter = %config.exporter))]
pub fn init_metrics(
    service_name: &'static str,
    config: &MetricsConfig,
) -> Result<MetricsGuard, ConfigError> {
    config.validate()?;
    if config.exporter == MetricsExporter::None {
        info!("Metrics export disabled");
        return Ok(MetricsGuard::default());
    }

    #[cfg(not(feature = "metrics"))]
    {
        warn!(
            service_name,
            "Built without the metrics feature, measurements will not be exported"
        );
        Ok(MetricsGuard::default())
    }

    #[cfg(feature = "metrics")]
    {
        let interval = Duration::from_secs(config.export_interval_secs);
        let reader = match config.exporter {
            MetricsExporter::Otlp => {
                let exporter = OtlpExporter::builder()
                    .with_http()
                    .with_endpoint(config.otlp_endpoint.as_str())
                    .with_timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| {
                        ConfigError::new(format!("Failed to create OTLP exporter: {e}"))
                    })?;
                PeriodicReader::builder(exporter)
                    .with_interval(interval)
                    .build()
            }
            MetricsExporter::Stdout | MetricsExporter::None => {
                PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                    .with_interval(interval)
                    .build()
            }
        };

        let resource = Resource::builder()
            .with_service_name(service_name)
            .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
            .build();
        let provider = SdkMeterProvider::builder()
            .with_resource(resource)
            .with_reader(reader)
            .build();
        global::set_meter_provider(provider.clone());
        info!(
            service_name,
            endpoint = %config.otlp_endpoint,
            interval_secs = config.export_interval_secs,
            "Metrics export started"
        );

        Ok(MetricsGuard {
            provider: Some(provider),
        })
    }
}
