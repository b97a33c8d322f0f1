//! Structured logging setup.
//!
//! # Responsibilities
//! - Build the tracing subscriber from the observability config
//! - Let `RUST_LOG` override the configured default filter
//!
//! # Design Decisions
//! - Initialization is idempotent; a second call is a no-op so tests can
//!   initialize freely

use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. Safe to call more than once.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
