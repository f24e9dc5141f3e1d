use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fs};

use crate::bands::SimilarityBands;
use crate::errors::{Result, StatsError};
use crate::tokens::TokenEstimatorKind;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "PERSONA_STATS_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub similarity_bands: SimilarityBands,
    #[serde(default)]
    pub token_estimator: TokenEstimatorKind,
    /// Default log level when `RUST_LOG` is unset: `off`, `error`, `warn`,
    /// `info`, `debug` or `trace`.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Configuration {
    pub fn from_yaml(contents: &str, origin: &str) -> Result<Self> {
        let config: Configuration =
            serde_yaml::from_str(contents).map_err(|e| StatsError::Config {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        config
            .similarity_bands
            .validate()
            .map_err(|e| StatsError::Config {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(level) = config.log_level.as_deref() {
            level
                .parse::<log::LevelFilter>()
                .map_err(|_| StatsError::Config {
                    path: origin.to_string(),
                    reason: format!("unknown log_level `{level}`"),
                })?;
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|e| StatsError::Config {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&contents, &origin)
    }

    /// Load from `explicit`, else from `$PERSONA_STATS_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::info!("loading configuration from {}", path.display());
            return Self::from_file(path);
        }
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                log::info!("loading configuration from {} ({})", path, CONFIG_PATH_ENV);
                Self::from_file(path)
            }
            _ => {
                log::debug!("no configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("{}-{}.yaml", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
similarity_bands:
  high: 0.8
  medium: 0.5
token_estimator: cl100k
log_level: debug
"#;
        let config = Configuration::from_yaml(yaml, "inline").unwrap();
        assert_eq!(
            config,
            Configuration {
                similarity_bands: SimilarityBands {
                    high: 0.8,
                    medium: 0.5,
                },
                token_estimator: TokenEstimatorKind::Cl100k,
                log_level: Some("debug".to_string()),
            }
        );
    }

    #[test]
    fn test_empty_sections_use_defaults() {
        let config = Configuration::from_yaml("similarity_bands:\n  high: 0.9\n", "inline").unwrap();
        assert_eq!(config.similarity_bands.high, 0.9);
        assert_eq!(config.similarity_bands.medium, 0.4);
        assert_eq!(config.token_estimator, TokenEstimatorKind::Approx);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_invalid_bands_rejected() {
        let yaml = "similarity_bands:\n  high: 0.3\n  medium: 0.6\n";
        let err = Configuration::from_yaml(yaml, "bands.yaml").unwrap_err();
        assert!(matches!(err, StatsError::Config { ref path, .. } if path == "bands.yaml"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Configuration::from_yaml("log_level: loud\n", "levels.yaml").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration at `levels.yaml`: unknown log_level `loud`"
        );
        let config = Configuration::from_yaml("log_level: TRACE\n", "levels.yaml").unwrap();
        assert_eq!(config.log_level.as_deref(), Some("TRACE"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Configuration::from_yaml("tokeniser: approx\n", "inline").is_err());
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_env() {
        env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(Configuration::load(None).unwrap(), Configuration::default());
    }

    #[test]
    #[serial]
    fn test_load_from_env_path() {
        let path = write_temp("persona-stats-env", "token_estimator: cl100k\n");
        env::set_var(CONFIG_PATH_ENV, &path);
        let config = Configuration::load(None);
        env::remove_var(CONFIG_PATH_ENV);
        fs::remove_file(&path).unwrap();

        assert_eq!(config.unwrap().token_estimator, TokenEstimatorKind::Cl100k);
    }

    #[test]
    #[serial]
    fn test_explicit_path_wins_over_env() {
        let path = write_temp("persona-stats-explicit", "log_level: warn\n");
        env::set_var(CONFIG_PATH_ENV, "/nonexistent/persona-stats.yaml");
        let config = Configuration::load(Some(&path));
        env::remove_var(CONFIG_PATH_ENV);
        fs::remove_file(&path).unwrap();

        assert_eq!(config.unwrap().log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_missing_file() {
        let err = Configuration::from_file("/nonexistent/persona-stats.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/persona-stats.yaml"));
    }
}
