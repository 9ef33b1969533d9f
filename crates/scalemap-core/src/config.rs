//! Engine configuration.
//!
//! Loaded from JSON, with the builtin `data/engine_config.json` as fallback and
//! `SCALEMAP_CONFIG_PATH` as an override.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.json");

/// Environment variable naming a config file to load instead of the builtin one
pub const CONFIG_PATH_ENV: &str = "SCALEMAP_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scale drop between a tile and the tiles of its sub-map
    pub granularity_step: i32,
    /// Withdrawal amounts at or below this are treated as zero
    pub withdrawal_epsilon: f64,
    /// Validate the tree structure when a generator hands it over
    pub validate_on_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            granularity_step: 1,
            withdrawal_epsilon: 1e-9,
            validate_on_load: true,
        }
    }
}

impl EngineConfig {
    pub fn builtin() -> Self {
        // The builtin file is covered by tests; fall back to defaults rather than panic.
        Self::from_json_str(BUILTIN_ENGINE_CONFIG).unwrap_or_default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.granularity_step <= 0 {
            return Err(ConfigError::Invalid(format!(
                "granularity_step must be positive, got {}",
                self.granularity_step
            )));
        }
        if self.withdrawal_epsilon.is_nan() || self.withdrawal_epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "withdrawal_epsilon must be non-negative, got {}",
                self.withdrawal_epsilon
            )));
        }
        Ok(())
    }
}

/// Load the engine config from `SCALEMAP_CONFIG_PATH`, falling back to the builtin.
///
/// Returns the config and the path it came from (`None` for the builtin).
pub fn load_engine_config_from_env() -> (EngineConfig, Option<PathBuf>) {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        match EngineConfig::from_file(&path) {
            Ok(config) => {
                log::info!("engine config loaded from {}", path.display());
                return (config, Some(path));
            }
            Err(err) => {
                log::warn!(
                    "engine config load failed at {}: {}. Using builtin config.",
                    path.display(),
                    err
                );
            }
        }
    }

    log::info!("engine config loaded from builtin");
    (EngineConfig::builtin(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let builtin = EngineConfig::from_json_str(BUILTIN_ENGINE_CONFIG).expect("builtin parses");
        assert_eq!(builtin, EngineConfig::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "granularity_step": 3 }"#).unwrap();
        assert_eq!(config.granularity_step, 3);
        assert_eq!(config.withdrawal_epsilon, 1e-9);
        assert!(config.validate_on_load);
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let err = EngineConfig::from_json_str(r#"{ "granularity_step": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = EngineConfig::from_json_str("{ granularity_step").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/scalemap.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
