//! Environment-derived settings.

use std::env;
use std::path::Path;

/// Terminal width assumed when `COLUMNS` is unset or unusable.
pub const DEFAULT_COLUMNS: usize = 80;
/// Filter directive variable for logging.
pub const LOG_ENV: &str = "ARGPARSER_LOG";
/// Program name used when neither `setup` nor argv[0] supplies one.
const DEFAULT_PROG: &str = "argparser";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Terminal columns available for help and usage text
    pub columns: usize,
    /// Program name when no `setup` record sets one
    pub fallback_prog: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            columns: DEFAULT_COLUMNS,
            fallback_prog: DEFAULT_PROG.to_string(),
        }
    }
}

impl Settings {
    /// Read `COLUMNS` and the process's own argv[0].
    pub fn from_env() -> Self {
        let columns = env::var("COLUMNS").ok();
        let argv0 = env::args_os().next();
        Self::from_parts(
            columns.as_deref(),
            argv0.as_deref().map(|s| s.to_string_lossy()).as_deref(),
        )
    }

    pub fn from_parts(columns: Option<&str>, argv0: Option<&str>) -> Self {
        let columns = columns
            .and_then(|c| c.trim().parse::<usize>().ok())
            .filter(|&c| c > 0)
            .unwrap_or(DEFAULT_COLUMNS);

        let fallback_prog = argv0
            .and_then(|p| Path::new(p).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_PROG.to_string());

        tracing::trace!(columns, fallback_prog = %fallback_prog, "settings");
        Settings {
            columns,
            fallback_prog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        assert_eq!(Settings::from_parts(None, None), Settings::default());
    }

    #[test]
    fn test_columns_parsed() {
        assert_eq!(Settings::from_parts(Some("120"), None).columns, 120);
        assert_eq!(Settings::from_parts(Some(" 60 "), None).columns, 60);
    }

    #[test]
    fn test_bad_columns_fall_back() {
        for raw in ["", "wide", "-3", "0"] {
            assert_eq!(
                Settings::from_parts(Some(raw), None).columns,
                DEFAULT_COLUMNS,
                "COLUMNS={:?}",
                raw
            );
        }
    }

    #[test]
    fn test_fallback_prog_is_basename() {
        let settings = Settings::from_parts(None, Some("/usr/local/bin/argparser"));
        assert_eq!(settings.fallback_prog, "argparser");

        let settings = Settings::from_parts(None, Some("./target/debug/tool"));
        assert_eq!(settings.fallback_prog, "tool");
    }
}
