//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Binaries and test
//! harnesses embedding the cache call [`init_tracing`] once at startup.

use ddc_core::{ConfigError, DdcResult};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_VAR: &str = "DDC_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_VAR: &str = "DDC_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                field: LOG_FORMAT_VAR.to_string(),
                value: s.to_string(),
                reason: "expected pretty or json".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `"ddc_engine=debug,info"`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Read `DDC_LOG` and `DDC_LOG_FORMAT`.
    pub fn from_env() -> DdcResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<L>(lookup: L) -> DdcResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = lookup(LOG_FILTER_VAR).filter(|v| !v.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup(LOG_FORMAT_VAR).filter(|v| !v.trim().is_empty()) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    fn env_filter(&self) -> DdcResult<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            ConfigError::InvalidValue {
                field: LOG_FILTER_VAR.to_string(),
                value: self.filter.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Install the global tracing subscriber.
///
/// Returns `Ok(false)` if another subscriber was already installed, which is
/// common when several tests share a process.
pub fn init_tracing(config: &TelemetryConfig) -> DdcResult<bool> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    Ok(installed.is_ok())
}
