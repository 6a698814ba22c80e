//! Agent configuration, parsed from the `-agentpath:...=<options>` string.

use log::warn;
use thiserror::Error;

/// Thread name captured when no `thread=` option is given.
pub const DEFAULT_THREAD_NAME: &str = "HighResTimer";

/// Rendered-frame bound when no `frames=` option is given.
pub const DEFAULT_MAX_FRAMES: i32 = 10;

/// Frames skipped above the capture site: the Thread constructor overloads
/// sitting between the `name` field write and the interesting callers.
pub const DEFAULT_SKIP_FRAMES: i32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("thread name must not be empty")]
    EmptyThreadName,
    #[error("expected a positive integer for {key}, got {value:?}")]
    BadNumber { key: &'static str, value: String },
}

/// Runtime configuration. All values have documented defaults; the options
/// string only overrides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Thread display name that triggers a capture. Compared for exact,
    /// case-sensitive equality.
    pub thread_name: String,
    /// Upper bound on rendered frames; deeper stacks are truncated.
    pub max_frames: i32,
    /// Frames to skip above the capture site.
    pub skip_frames: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            skip_frames: DEFAULT_SKIP_FRAMES,
        }
    }
}

impl Config {
    /// Parses a comma-separated options string.
    ///
    /// Recognized keys: `thread=<name>`, `frames=<n>`, `skip=<n>`. A bare
    /// token with no `=` is taken as the thread name, so
    /// `-agentpath:libstartcatch.so=MyWorker` does what it looks like.
    /// Unknown keys are ignored with a warning.
    pub fn from_options(options: &str) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        for token in options.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                Some(("thread", value)) => cfg.thread_name = value.to_string(),
                Some(("frames", value)) => {
                    cfg.max_frames = parse_positive("frames", value)?;
                }
                Some(("skip", value)) => {
                    cfg.skip_frames = parse_non_negative("skip", value)?;
                }
                Some((key, _)) => warn!("ignoring unknown agent option {key:?}"),
                None => cfg.thread_name = token.to_string(),
            }
        }
        if cfg.thread_name.is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        Ok(cfg)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<i32, ConfigError> {
    value
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::BadNumber { key, value: value.to_string() })
}

fn parse_non_negative(key: &'static str, value: &str) -> Result<i32, ConfigError> {
    value
        .parse::<i32>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| ConfigError::BadNumber { key, value: value.to_string() })
}
