use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{dflog_debug, Error, Result};

fn default_duration() -> f64 {
    1.0
}

/// Engine configuration.
///
/// The engine takes a single tunable: the duration assigned to tasks whose
/// snapshot record carries no `durationEstimate`. Everything else the
/// engine derives from the task data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Duration assigned to tasks with no estimate of their own.
    #[serde(default = "default_duration")]
    pub default_duration: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
        }
    }
}

impl Config {
    pub fn depflow_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".depflow"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::depflow_dir()?.join("depflow.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        dflog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            dflog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        dflog_debug!("Config loaded: default_duration={}", config.default_duration);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::depflow_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        dflog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
