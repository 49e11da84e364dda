//! Structured logging and tracing.
//!
//! Provides structured logging via the `tracing` crate with:
//! - Level-based filtering with per-module overrides, loadable from RON or JSON
//! - Spans around the long engine passes (explosions, FOV, lighting)
//! - Idempotent initialization, safe to call from every entry point

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Installs the global subscriber when added to an app. The first
/// initialization in the process wins.
#[derive(Default)]
pub struct LoggingPlugin {
    pub config: TracingConfig,
}

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&self.config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Filter directives for the battlescape targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub level: LogLevel,
    /// `(target, level)` overrides, e.g. `("battlescape_core::explosion", Debug)`
    pub targets: Vec<(String, LogLevel)>,
    pub with_target: bool,
    pub with_source_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            targets: [
                ("battlescape_core::explosion", LogLevel::Debug),
                ("battlescape_core::reaction", LogLevel::Debug),
                ("battlescape_core::visibility", LogLevel::Info),
                ("battlescape_core::engine", LogLevel::Info),
            ]
            .into_iter()
            .map(|(target, level)| (target.to_string(), level))
            .collect(),
            with_target: true,
            with_source_location: false,
        }
    }
}

impl TracingConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// `EnvFilter` directive string: the default level, then one
    /// `target=level` per override.
    pub fn directives(&self) -> String {
        let name = |level: LogLevel| tracing::Level::from(level).as_str().to_ascii_lowercase();
        std::iter::once(name(self.level))
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{target}={}", name(*level))),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// `RUST_LOG` takes precedence over the configured directives.
pub fn init_tracing(config: &TracingConfig) {
    let directives = config.directives();
    let with_target = config.with_target;
    let with_source = config.with_source_location;
    TRACING_INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
        // a subscriber installed elsewhere (e.g. by a host app) stays in place
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(with_target)
            .with_file(with_source)
            .with_line_number(with_source)
            .compact()
            .try_init();
    });
}

/// Entered span around one engine pass; closes when dropped.
pub struct TimingSpan {
    _entered: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(pass: &'static str) -> Self {
        Self {
            _entered: tracing::debug_span!("pass", pass).entered(),
        }
    }
}
