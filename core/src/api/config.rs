use crate::badge::DEFAULT_BADGE_CAP;
use crate::error::DebuggerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Maximum bytes of a request or response body kept on a record (512 KiB)
pub const MAX_BODY_CAPTURE_BYTES: usize = 512 * 1024;

/// Bodies larger than this are not rendered in the detail view (100 KiB)
pub const PREVIEW_LIMIT_BYTES: usize = 100 * 1024;

/// Debugger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Cap on recorded body bytes; forwarded bodies are never truncated
    pub max_body_capture_bytes: usize,
    /// Count above which the badge shows "{cap}+"
    pub badge_cap: usize,
    /// Largest body the preview renderer will format
    pub preview_limit_bytes: usize,
    /// Log level override (falls back to `RUST_LOG`)
    pub log_level: Option<String>,
    /// Directory for rolling log files; logs go to stderr when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            max_body_capture_bytes: MAX_BODY_CAPTURE_BYTES,
            badge_cap: DEFAULT_BADGE_CAP,
            preview_limit_bytes: PREVIEW_LIMIT_BYTES,
            log_level: None,
            log_dir: None,
        }
    }
}

impl DebuggerConfig {
    pub fn from_json(json: &str) -> Result<Self, DebuggerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `NETDEBUG_*` environment variables.
    pub fn from_env() -> Result<Self, DebuggerError> {
        let mut config = Self::default();
        if let Some(value) = env_parse("NETDEBUG_MAX_BODY_BYTES")? {
            config.max_body_capture_bytes = value;
        }
        if let Some(value) = env_parse("NETDEBUG_BADGE_CAP")? {
            config.badge_cap = value;
        }
        if let Some(value) = env_parse("NETDEBUG_PREVIEW_LIMIT")? {
            config.preview_limit_bytes = value;
        }
        if let Ok(level) = std::env::var("NETDEBUG_LOG_LEVEL") {
            config.log_level = Some(level);
        }
        if let Some(dir) = std::env::var_os("NETDEBUG_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DebuggerError> {
        if self.badge_cap == 0 {
            return Err(DebuggerError::Config("badge_cap must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, DebuggerError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DebuggerError::Config(format!("{key}={raw:?} is not a valid number"))),
        Err(_) => Ok(None),
    }
}
