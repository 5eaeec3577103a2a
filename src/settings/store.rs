use std::path::{Path, PathBuf};

use crate::pipeline::error::{PipelineError, Result};
use crate::settings::types::PipelineSettings;

/// Environment variable naming the settings file used by the binary.
pub const SETTINGS_ENV: &str = "FACEFILTER_SETTINGS";

impl PipelineSettings {
    /// Load and validate settings from a JSON file, returning defaults when
    /// the file does not exist. Settings are never written back.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| PipelineError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings from the file named by `FACEFILTER_SETTINGS`, or defaults.
    pub fn from_env() -> Result<Self> {
        match settings_path_from_env() {
            Some(path) => {
                tracing::info!("loading settings from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn settings_path_from_env() -> Option<PathBuf> {
    std::env::var_os(SETTINGS_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
