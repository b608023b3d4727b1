//! # aural-config
//!
//! Environment-driven configuration for the bot: recognized keys, their
//! defaults, and eager validation at startup.
//!
//! Configuration is read only from environment variables, constructed once
//! by `aural-bot`'s `main` and threaded explicitly through the per-tenant
//! engines it owns rather than kept behind a process-wide singleton.
//!
//! Invalid configuration is fatal: the caller should log it and exit
//! rather than attempt to run in a half-configured state.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that make the process unable to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is required but not set")]
    Missing { key: &'static str },
    #[error("{key} must be at least {min} characters, got {actual}")]
    TooShort {
        key: &'static str,
        min: usize,
        actual: usize,
    },
    #[error("{key} must be at most {max} characters, got {actual}")]
    TooLong {
        key: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Recognized `LOG_LEVEL` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Maps to the `tracing` filter directive closest in meaning
    /// (`CRITICAL` has no tracing equivalent, so it maps to `error`).
    pub fn as_tracing_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

const BOT_TOKEN_MIN_LEN: usize = 50;
const COMMAND_PREFIX_MAX_LEN: usize = 5;

/// Process-wide configuration, constructed once from the environment.
pub struct Config {
    bot_token: String,
    command_prefix: String,
    playlist_dir: PathBuf,
    stay_connected_24_7: bool,
    log_level: LogLevel,
    log_file: Option<PathBuf>,
    cache_ttl: Duration,
    cache_max_entries: usize,
    worker_count: usize,
    max_queue_size: usize,
    stream_refresh_after: Duration,
}

impl fmt::Debug for Config {
    /// `BOT_TOKEN` is masked: never let it reach logs or panics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &mask_secret(&self.bot_token))
            .field("command_prefix", &self.command_prefix)
            .field("playlist_dir", &self.playlist_dir)
            .field("stay_connected_24_7", &self.stay_connected_24_7)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("worker_count", &self.worker_count)
            .field("max_queue_size", &self.max_queue_size)
            .field("stream_refresh_after", &self.stream_refresh_after)
            .finish()
    }
}

fn mask_secret(token: &str) -> String {
    if token.len() <= 8 {
        "*".repeat(token.len())
    } else {
        format!("{}…({} chars)", &token[..4], token.len())
    }
}

/// Default worker count by target architecture.
fn default_worker_count() -> usize {
    if cfg!(target_arch = "aarch64") {
        2
    } else if cfg!(target_arch = "arm") {
        1
    } else {
        3
    }
}

impl Config {
    /// Loads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let bot_token = require_env("BOT_TOKEN")?;
        if bot_token.len() < BOT_TOKEN_MIN_LEN {
            return Err(ConfigError::TooShort {
                key: "BOT_TOKEN",
                min: BOT_TOKEN_MIN_LEN,
                actual: bot_token.len(),
            });
        }

        let command_prefix = env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string());
        if command_prefix.len() > COMMAND_PREFIX_MAX_LEN {
            return Err(ConfigError::TooLong {
                key: "COMMAND_PREFIX",
                max: COMMAND_PREFIX_MAX_LEN,
                actual: command_prefix.len(),
            });
        }

        let playlist_dir = env::var("PLAYLIST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./playlists"));

        let stay_connected_24_7 = parse_bool_env("STAY_CONNECTED_24_7", false)?;

        let log_level = match env::var("LOG_LEVEL") {
            Ok(raw) => LogLevel::parse(&raw).ok_or(ConfigError::Invalid {
                key: "LOG_LEVEL",
                value: raw,
                reason: "expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL",
            })?,
            Err(_) => LogLevel::Info,
        };

        let log_file = env::var("LOG_FILE").ok().map(PathBuf::from);

        let cache_ttl = Duration::from_secs(parse_u64_env("CACHE_TTL_SECONDS", 7200)?);
        let cache_max_entries = parse_usize_env("CACHE_MAX_ENTRIES", 1000)?;
        let worker_count = match env::var("WORKER_COUNT") {
            Ok(raw) => parse_usize("WORKER_COUNT", &raw)?,
            Err(_) => default_worker_count(),
        };
        let max_queue_size = parse_usize_env("MAX_QUEUE_SIZE", 100)?;
        let stream_refresh_after =
            Duration::from_secs(parse_u64_env("STREAM_REFRESH_AFTER_SECONDS", 18_000)?);

        Ok(Self {
            bot_token,
            command_prefix,
            playlist_dir,
            stay_connected_24_7,
            log_level,
            log_file,
            cache_ttl,
            cache_max_entries,
            worker_count,
            max_queue_size,
            stream_refresh_after,
        })
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn playlist_dir(&self) -> &std::path::Path {
        &self.playlist_dir
    }

    pub fn stay_connected_24_7(&self) -> bool {
        self.stay_connected_24_7
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn stream_refresh_after(&self) -> Duration {
        self.stream_refresh_after
    }
}

fn require_env(key: &'static str) -> Result<String> {
    env::var(key).map_err(|_| ConfigError::Missing { key })
}

fn parse_bool_env(key: &'static str, default: bool) -> Result<bool> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                reason: "expected a boolean (true/false, 1/0, yes/no, on/off)",
            }),
        },
    }
}

fn parse_u64_env(key: &'static str, default: u64) -> Result<u64> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a non-negative integer",
        }),
    }
}

fn parse_usize_env(key: &'static str, default: usize) -> Result<usize> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => parse_usize(key, &raw),
    }
}

fn parse_usize(key: &'static str, raw: &str) -> Result<usize> {
    raw.parse::<usize>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: "expected a non-negative integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "BOT_TOKEN",
            "COMMAND_PREFIX",
            "PLAYLIST_DIR",
            "STAY_CONNECTED_24_7",
            "LOG_LEVEL",
            "LOG_FILE",
            "CACHE_TTL_SECONDS",
            "CACHE_MAX_ENTRIES",
            "WORKER_COUNT",
            "MAX_QUEUE_SIZE",
            "STREAM_REFRESH_AFTER_SECONDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn rejects_missing_token() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing { key: "BOT_TOKEN" })
        ));
    }

    #[test]
    fn rejects_short_token() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("BOT_TOKEN", "short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::TooShort { key: "BOT_TOKEN", .. })
        ));
    }

    #[test]
    fn applies_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("BOT_TOKEN", "x".repeat(60));
        let config = Config::from_env().unwrap();
        assert_eq!(config.command_prefix(), "!");
        assert_eq!(config.cache_ttl(), Duration::from_secs(7200));
        assert_eq!(config.max_queue_size(), 100);
        assert_eq!(
            config.stream_refresh_after(),
            Duration::from_secs(18_000)
        );
    }

    #[test]
    fn rejects_long_prefix() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("BOT_TOKEN", "x".repeat(60));
        env::set_var("COMMAND_PREFIX", "toolong!");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::TooLong { key: "COMMAND_PREFIX", .. })
        ));
    }

    #[test]
    fn masks_token_in_debug() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("BOT_TOKEN", "abcdefgh".repeat(7));
        let config = Config::from_env().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(config.bot_token()));
        assert!(debug.contains("abcd"));
    }

    #[test]
    fn rejects_bad_log_level() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("BOT_TOKEN", "x".repeat(60));
        env::set_var("LOG_LEVEL", "VERBOSE");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { key: "LOG_LEVEL", .. })
        ));
    }
}
