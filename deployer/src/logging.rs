//! # Logging
//!
//! `metavault` reports its results (contract addresses, interface JSON,
//! scenario reports) on stdout, so every log line goes to stderr. Vault
//! transitions log under the `metavault_contracts` target, deployment
//! steps under `metavault`.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: deployment progress, but only
/// warnings (reverted transitions, rejected re-entry) from the ledger.
pub const DEFAULT_FILTER: &str = "metavault=info,metavault_contracts=warn";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines for a terminal.
    Pretty,
    /// One JSON object per line, for piping into a collector.
    Json,
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `default_filter`, e.g. `RUST_LOG=metavault_contracts=debug` to see every
/// committed transition.
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}
