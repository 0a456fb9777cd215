use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(1); // WARN

/// Dynamic tracing filter that can be updated at runtime
#[derive(Debug, Clone, Copy)]
pub struct DynamicFilter;

impl<S> Layer<S> for DynamicFilter
where
    S: Subscriber,
{
    fn enabled(
        &self,
        metadata: &tracing::Metadata<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        TracingLevel::from_level(*metadata.level()).as_u8() <= CURRENT_LEVEL.load(Ordering::Relaxed)
    }
}

/// Represents tracing levels that can be set dynamically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Build summaries
    Info,
    /// Every mapper built
    Debug,
    /// Cache hits and duplicate registrations
    Trace,
}

impl FromStr for TracingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "Invalid tracing level '{s}'. Valid levels are: error, warn, info, debug, trace"
            )),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TracingLevel {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
            Self::Trace => 4,
        }
    }

    const fn from_level(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }

    /// Lowercase level name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Initialize stderr tracing filtered at `level`
    ///
    /// Stdout is left to converted output.
    pub fn init_stderr_tracing(level: Self) {
        Self::set_tracing_level(level);

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);

        Registry::default()
            .with(DynamicFilter)
            .with(stderr_layer)
            .init();
    }

    /// Get the current tracing level
    #[must_use]
    pub fn get_current_tracing_level() -> Self {
        match CURRENT_LEVEL.load(Ordering::Relaxed) {
            0 => Self::Error,
            2 => Self::Info,
            3 => Self::Debug,
            4 => Self::Trace,
            _ => Self::Warn,
        }
    }

    /// Set the current tracing level dynamically
    pub fn set_tracing_level(level: Self) {
        CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);
    }
}

impl From<TracingLevel> for Level {
    fn from(level: TracingLevel) -> Self {
        match level {
            TracingLevel::Error => Self::ERROR,
            TracingLevel::Warn => Self::WARN,
            TracingLevel::Info => Self::INFO,
            TracingLevel::Debug => Self::DEBUG,
            TracingLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!("DEBUG".parse::<TracingLevel>().unwrap(), TracingLevel::Debug);
        assert_eq!("warn".parse::<TracingLevel>().unwrap(), TracingLevel::Warn);
        assert!("verbose".parse::<TracingLevel>().is_err());
    }

    #[test]
    fn levels_round_trip_through_their_names() {
        for level in [
            TracingLevel::Error,
            TracingLevel::Warn,
            TracingLevel::Info,
            TracingLevel::Debug,
            TracingLevel::Trace,
        ] {
            assert_eq!(level.to_string().parse::<TracingLevel>().unwrap(), level);
            assert_eq!(TracingLevel::from_level(Level::from(level)), level);
        }
    }

    #[test]
    fn setting_the_level_is_visible_to_the_filter() {
        TracingLevel::set_tracing_level(TracingLevel::Trace);
        assert_eq!(
            TracingLevel::get_current_tracing_level(),
            TracingLevel::Trace
        );
        TracingLevel::set_tracing_level(TracingLevel::Warn);
        assert_eq!(TracingLevel::get_current_tracing_level(), TracingLevel::Warn);
    }
}
