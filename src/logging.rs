// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Structured JSON logging setup for hosts embedding the engine.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "attendance_streaks=debug,info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a global JSON subscriber, failing if one is already set.
pub fn try_init_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(format)
        .try_init()
}

/// Initialize structured JSON logging.
///
/// Does nothing if the host already installed a subscriber.
pub fn init_logging() {
    if try_init_logging().is_err() {
        tracing::debug!("Global subscriber already set, keeping it");
    }
}
