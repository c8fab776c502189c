use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::recurrence::DEFAULT_OCCURRENCE_CAP;

pub const APP_NAME: &str = "daybook";
const MAX_RECURRENCE_CAP: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_NAME)
}

fn default_recurrence_cap() -> u32 {
    DEFAULT_OCCURRENCE_CAP
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub recurrence_cap: u32,
    pub debug_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            recurrence_cap: default_recurrence_cap(),
            debug_logging: false,
        }
    }
}

impl Config {
    /// `<config_dir>/daybook/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join("config.json"))
    }

    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.recurrence_cap = config.recurrence_cap.clamp(1, MAX_RECURRENCE_CAP);
        Ok(config)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.json")
    }
}
