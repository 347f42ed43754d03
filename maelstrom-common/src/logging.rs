use std::{fs::OpenOptions, path::PathBuf, str::FromStr};

use serde::Deserialize;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, fmt::writer::BoxMakeWriter,
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Calls out to a provider or metadata server
#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "outgoing", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::outgoing!(level = TRACE, $($msg),*)
    };
}

/// Requests arriving at the gateway
#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "incoming", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::incoming!(level = TRACE, $($msg),*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level to emit. `LOG_LEVEL` in the environment wins over this.
    #[serde(default)]
    pub level: Option<String>,

    /// Append log lines to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Never log below DEBUG, regardless of the configured level
    #[serde(skip)]
    pub debug: bool,
}

impl LoggingConfig {
    fn level(&self) -> LevelFilter {
        let default = if cfg!(debug_assertions) {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        };

        let configured = std::env::var("LOG_LEVEL")
            .ok()
            .or_else(|| self.level.clone())
            .map_or(default, |level| {
                LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
                    eprintln!("Invalid log level specified {level}, defaulting to {default}");
                    default
                })
            });

        if self.debug {
            configured.max(LevelFilter::DEBUG)
        } else {
            configured
        }
    }

    fn writer(&self) -> (BoxMakeWriter, bool) {
        let Some(path) = &self.file else {
            return (BoxMakeWriter::new(std::io::stdout), true);
        };

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(std::sync::Mutex::new(file)), false),
            Err(err) => {
                eprintln!(
                    "Error opening log file {}: {err}, logging to stdout",
                    path.display()
                );
                (BoxMakeWriter::new(std::io::stdout), true)
            }
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call has any effect, so tests may call this freely.
pub fn init(config: &LoggingConfig) {
    let level = config.level();
    let (writer, ansi) = config.writer();

    let installed = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(ansi)
                .with_writer(writer)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("maelstrom")
                })),
        )
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
}
