//! Utilities for logging.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Compact human readable output.
    #[default]
    Compact,
    /// Full output including span context.
    Full,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Info,
    Debug,
    Trace,
}

impl From<Verbosity> for Level {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

/// Build an env filter, letting `RUST_LOG` override the default level.
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize a global subscriber.
///
/// Does nothing if a global subscriber has already been set.
pub fn init(verbosity: impl Into<Verbosity>, mode: LoggingMode) {
    let level: Level = verbosity.into().into();
    let builder = SubscriberBuilder::default()
        .with_env_filter(env_filter(level))
        .with_thread_ids(true)
        .with_target(true);

    let _ = match mode {
        LoggingMode::Compact => builder.compact().try_init(),
        LoggingMode::Full => builder.try_init(),
        LoggingMode::Json => builder.json().try_init(),
    };
}

/// Initialize a subscriber that writes through the test harness' captured
/// output.
pub fn init_test() {
    let _ = SubscriberBuilder::default()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_test_writer()
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test();
        init_test();
        init(Verbosity::Trace, LoggingMode::Json);
        tracing::debug!(attempt = 3, "logging initialized");
    }

    #[test]
    fn verbosity_to_level() {
        assert_eq!(Level::TRACE, Level::from(Verbosity::Trace));
        assert_eq!(Level::INFO, Level::from(Verbosity::Info));
    }
}
