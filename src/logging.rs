// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Logging setup for hosts embedding the marshalling layer.
//!
//! The crate itself only emits `tracing` events; installing a subscriber is
//! the host's decision. [`init_logging`] is a one-call setup for hosts that
//! don't have their own.
//!
//! Event targets:
//!
//! - `slang_marshal::registry` - adapter resolution (debug)
//! - `slang_marshal::reflection` - reflection queries (trace)
//! - `slang_marshal::adapter` - suspicious but accepted inputs (warn)
//! - `slang_marshal::launch` - kernel launches (debug)
//!
//! `RUST_LOG` always overrides the configured level, e.g.
//! `RUST_LOG=slang_marshal::registry=debug`.

use std::sync::Once;
use tracing::Level;

/// Subscriber settings for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset.
    pub default_level: Level,
    /// Prefix events with a timestamp.
    pub with_timestamps: bool,
    /// Show the event target, e.g. `slang_marshal::registry`.
    pub with_target: bool,
    /// Colored output.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            with_timestamps: true,
            with_target: true,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Every adapter resolution and launch, with targets, for interactive runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            default_level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// Plain info-level lines for log collectors.
    #[must_use]
    pub fn production() -> Self {
        Self {
            with_target: false,
            with_ansi: false,
            ..Self::default()
        }
    }

    /// Warnings only, no timestamps or colors.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            default_level: Level::WARN,
            with_timestamps: false,
            with_target: false,
            with_ansi: false,
        }
    }

    fn filter(&self) -> String {
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| self.default_level.to_string().to_ascii_lowercase())
    }
}

static INIT_LOGGING: Once = Once::new();

/// Install a global `tracing` subscriber.
///
/// Only the first call has any effect. If the host already installed a
/// subscriber, this one is silently not installed.
///
/// ## Example
///
/// ```rust
/// use slang_marshal::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::development());
/// ```
pub fn init_logging(config: &LogConfig) {
    INIT_LOGGING.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(config.filter())
            .with_ansi(config.with_ansi)
            .with_target(config.with_target);

        // try_init: a subscriber installed by the host wins.
        let _ = if config.with_timestamps {
            builder.try_init()
        } else {
            builder.without_time().try_init()
        };
    });
}
