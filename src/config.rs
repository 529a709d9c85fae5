//! Engine and store configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_SURFACE_WIDTH: u32 = 4000;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 3000;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STORE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Parse `key` from the environment, falling back to `default` when the
/// variable is missing or does not parse.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_parse_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Per-session engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ink and preview surface size in pixels. Pixel (0, 0) is scene origin.
    pub surface_width: u32,
    pub surface_height: u32,
    /// Maximum number of ink snapshots kept for undo.
    pub history_limit: usize,
    /// Seed for rotation and placement jitter. `None` draws from OS entropy.
    pub jitter_seed: Option<u64>,
    pub ai_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_width: DEFAULT_SURFACE_WIDTH,
            surface_height: DEFAULT_SURFACE_HEIGHT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            jitter_seed: None,
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Build from environment variables.
    ///
    /// Optional:
    /// - `STUDYBOARD_SURFACE_WIDTH`: default 4000
    /// - `STUDYBOARD_SURFACE_HEIGHT`: default 3000
    /// - `STUDYBOARD_HISTORY_LIMIT`: default 20
    /// - `STUDYBOARD_AI_TIMEOUT_SECS`: default 60
    /// - `STUDYBOARD_JITTER_SEED`: unset by default
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            surface_width: env_parse("STUDYBOARD_SURFACE_WIDTH", DEFAULT_SURFACE_WIDTH),
            surface_height: env_parse("STUDYBOARD_SURFACE_HEIGHT", DEFAULT_SURFACE_HEIGHT),
            history_limit: env_parse("STUDYBOARD_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            jitter_seed: env_parse_opt("STUDYBOARD_JITTER_SEED"),
            ai_timeout_secs: env_parse("STUDYBOARD_AI_TIMEOUT_SECS", DEFAULT_AI_TIMEOUT_SECS),
        }
    }

    /// Defaults with a custom surface size.
    #[must_use]
    pub fn with_surface(width: u32, height: u32) -> Self {
        Self { surface_width: width, surface_height: height, ..Self::default() }
    }
}

/// Settings for [`crate::store::JsonFileStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Payloads larger than this are rejected with a quota error.
    pub max_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_STORE_MAX_BYTES }
    }
}

impl StoreConfig {
    /// Reads `STUDYBOARD_STORE_MAX_BYTES` (default 5 MiB).
    #[must_use]
    pub fn from_env() -> Self {
        Self { max_bytes: env_parse("STUDYBOARD_STORE_MAX_BYTES", DEFAULT_STORE_MAX_BYTES) }
    }
}
