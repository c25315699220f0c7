//! Lootledger Logging
//!
//! `tracing` subscriber setup shared by the binary and tests.

use tracing_subscriber::EnvFilter;

/// Verbosity used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Filter for `level`, unless `RUST_LOG` says otherwise.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn try_init(level: LogLevel) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Subscriber for tests: writes through the test harness capture.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(env_filter(LogLevel::Debug))
        .try_init();
}
