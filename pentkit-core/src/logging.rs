//! Logging initialization shared by the binaries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "pentkit=info,pentkit_core=info,pentkit_server=info";

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format '{}'. Use 'pretty' or 'json'", other)),
        }
    }
}

static INIT_ONCE: Once = Once::new();

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber with [`DEFAULT_FILTER`]
pub fn init(format: LogFormat) {
    init_with_filter(format, DEFAULT_FILTER);
}

/// Installs the global subscriber; later calls are no-ops
///
/// `default_filter` applies when `RUST_LOG` is unset. Logs go to stderr so
/// command output on stdout stays clean.
pub fn init_with_filter(format: LogFormat, default_filter: &str) {
    INIT_ONCE.call_once(|| {
        // A subscriber installed elsewhere (e.g. by a test harness) wins
        let _ = match format {
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(env_filter(default_filter))
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter(default_filter))
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
        };
    });
}
