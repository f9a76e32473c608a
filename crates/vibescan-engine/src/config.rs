use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vibescan_core::accumulator::DEFAULT_WINDOW_FRAMES;
use vibescan_core::quota::DEFAULT_FREE_DAILY_SCANS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
///
/// Layered: built-in defaults, then the TOML file named by
/// `VIBESCAN_CONFIG` (if any), then individual `VIBESCAN_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Frames averaged per scan.
    pub window_frames: usize,
    /// Scans a free user may start per day.
    pub free_daily_scans: u32,
    /// Capacity of the engine request queue.
    pub request_queue: usize,
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    window_frames: Option<usize>,
    free_daily_scans: Option<u32>,
    request_queue: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_data_dir().join("vibescan.db"),
            window_frames: DEFAULT_WINDOW_FRAMES,
            free_daily_scans: DEFAULT_FREE_DAILY_SCANS,
            request_queue: 4,
        }
    }
}

impl Config {
    /// Load configuration from the environment with defaults.
    ///
    /// A missing or malformed config file is logged and skipped.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("VIBESCAN_CONFIG") {
            match Self::from_file(Path::new(&path)) {
                Ok(c) => config = c,
                Err(e) => tracing::warn!(path, error = %e, "ignoring config file"),
            }
        }

        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Load a TOML file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let defaults = Self::default();
        Ok(Self {
            db_path: file.db_path.unwrap_or(defaults.db_path),
            window_frames: file.window_frames.unwrap_or(defaults.window_frames),
            free_daily_scans: file.free_daily_scans.unwrap_or(defaults.free_daily_scans),
            request_queue: file.request_queue.unwrap_or(defaults.request_queue),
        })
    }

    /// Override fields from `VIBESCAN_*` variables resolved through `lookup`.
    /// Unparsable values keep the current setting.
    pub fn apply_env(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            db_path: lookup("VIBESCAN_DB_PATH").map(PathBuf::from).unwrap_or(self.db_path),
            window_frames: parse_or(&lookup, "VIBESCAN_WINDOW_FRAMES", self.window_frames),
            free_daily_scans: parse_or(&lookup, "VIBESCAN_FREE_DAILY_SCANS", self.free_daily_scans),
            request_queue: parse_or(&lookup, "VIBESCAN_REQUEST_QUEUE", self.request_queue),
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("vibescan")
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: T) -> T {
    match lookup(key) {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "unparsable value; keeping current setting");
            current
        }),
        None => current,
    }
}
