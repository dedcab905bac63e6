//! Logger installation and driver debug-output verbosity.

use std::fmt;
use std::str::FromStr;

/// Which driver debug messages reach the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Everything except "other"-type notifications.
    #[default]
    Default,
    All,
    /// No debug callback is installed.
    None,
}

impl LogMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::All => "All",
            Self::None => "None",
        }
    }
}

impl FromStr for LogMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "all" | "verbose" => Ok(Self::All),
            "none" | "off" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the logger with everything enabled, then narrows the runtime
/// maximum to `level`. Safe to call more than once.
pub fn init(level: LogLevel) {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    log::set_max_level(level.as_level_filter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mode_parses_case_insensitively() {
        assert_eq!("ALL".parse::<LogMode>(), Ok(LogMode::All));
        assert_eq!(" none ".parse::<LogMode>(), Ok(LogMode::None));
        assert_eq!("Default".parse::<LogMode>(), Ok(LogMode::Default));
        assert!("loud".parse::<LogMode>().is_err());
    }

    #[test]
    fn log_level_display_round_trips() {
        for level in [
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    }

    #[test]
    fn level_filter_matches_variant() {
        assert_eq!(LogLevel::default().as_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.as_level_filter(), log::LevelFilter::Trace);
    }
}
