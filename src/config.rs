use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::progress::{ProgressEstimator, ProgressPolicy};

const APP_DIR: &str = "video-feedback-wizard";
const CONFIG_FILE: &str = "config.json";

/// Which analysis backend the app talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The real service at `endpoint`
    #[default]
    Http,
    /// Canned feedback, no network
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the analysis service
    pub endpoint: String,

    /// Give up on an analysis request after this many seconds
    pub request_timeout_secs: u64,

    pub backend: Backend,

    /// How progress is estimated while a run is in flight
    pub progress_policy: ProgressPolicy,

    /// Overrides the policy's tick interval (milliseconds)
    pub tick_ms: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            request_timeout_secs: 300,
            backend: Backend::default(),
            progress_policy: ProgressPolicy::default(),
            tick_ms: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the platform config directory, writing defaults
    /// there on first run.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            tracing::info!(path = %path.display(), "Loaded config");
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "Created default config");
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// A fresh estimator for one run.
    pub fn estimator(&self) -> ProgressEstimator {
        let estimator = ProgressEstimator::new(self.progress_policy);
        match self.tick_ms {
            Some(ms) => estimator.with_tick(Duration::from_millis(ms)),
            None => estimator,
        }
    }
}
