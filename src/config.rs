//! Configuration loading
//!
//! Reads `config.toml` from `$WEEKCHORES_CONFIG` or the user config
//! directory. A missing file means defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Participant;

pub const CONFIG_ENV: &str = "WEEKCHORES_CONFIG";
pub const DATA_DIR_ENV: &str = "WEEKCHORES_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// People who earn points, in display order
    #[serde(default = "default_participants")]
    pub participants: Vec<String>,

    /// Where the local store keeps its JSON files
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participants: default_participants(),
            data_dir: None,
            log_filter: default_log_filter(),
        }
    }
}

fn default_participants() -> Vec<String> {
    vec!["Simon".to_string(), "Noah".to_string()]
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$WEEKCHORES_CONFIG` or the default location, falling back
    /// to defaults when no file exists.
    pub fn load_default() -> Result<Self> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.roster().map(|_| ())
    }

    /// Validated participants. Names must be non-empty and unique.
    pub fn roster(&self) -> Result<Vec<Participant>> {
        if self.participants.is_empty() {
            return Err(Error::InvalidConfig("participants must not be empty".into()));
        }
        let mut seen = HashSet::new();
        self.participants
            .iter()
            .map(|name| {
                let participant = Participant::parse(name)
                    .map_err(|_| Error::InvalidConfig("participant names must not be empty".into()))?;
                if !seen.insert(participant.clone()) {
                    return Err(Error::InvalidConfig(format!(
                        "participant '{}' listed twice",
                        participant
                    )));
                }
                Ok(participant)
            })
            .collect()
    }

    /// `$WEEKCHORES_DATA_DIR`, then `data_dir`, then the platform data
    /// directory (e.g. `~/.local/share/weekchores` on Linux).
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        self.data_dir.clone().unwrap_or_else(|| {
            let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("weekchores");
            p
        })
    }
}

/// Path the default configuration is read from.
pub fn default_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|mut p| {
        p.push("weekchores");
        p.push("config.toml");
        p
    })
}
