use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::hardfork::{Hardfork, HardforkSchedule};
use crate::objects::ChainParameters;
use crate::types::Timestamp;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unknown hardfork '{0}'")]
    UnknownHardfork(String),
    #[error("Invalid activation time '{value}' for {name}: expected RFC 3339")]
    InvalidTimestamp { name: String, value: String },
    #[error("Invalid chain parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ChainConfig {
    #[serde(default)]
    pub parameters: ChainParameters,
    /// Activation overrides keyed by hardfork name, e.g.
    /// `abuse_accounting = "2018-01-01T00:00:00Z"`.
    #[serde(default)]
    pub hardforks: BTreeMap<String, String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ChainConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ChainConfig = toml::from_str(&contents)?;
        config.parameters.validate()?;
        config.hardfork_schedule()?;
        Ok(config)
    }

    pub fn load_or_default(path: &str) -> Self {
        if Path::new(path).exists() {
            match Self::load(path) {
                Ok(config) => {
                    info!(path, "config loaded");
                    config
                }
                Err(e) => {
                    warn!(path, error = %e, "config unusable, using defaults");
                    Self::default()
                }
            }
        } else {
            info!(path, "config file not found, creating default");
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                if let Err(e) = std::fs::write(path, s) {
                    warn!(path, error = %e, "could not write default config");
                }
            }
            config
        }
    }

    /// Mainnet gates with this config's overrides applied.
    pub fn hardfork_schedule(&self) -> Result<HardforkSchedule, ConfigError> {
        let mut schedule = HardforkSchedule::mainnet();
        for (name, value) in &self.hardforks {
            let hardfork =
                Hardfork::from_name(name).ok_or_else(|| ConfigError::UnknownHardfork(name.clone()))?;
            let invalid = || ConfigError::InvalidTimestamp {
                name: name.clone(),
                value: value.clone(),
            };
            let parsed = chrono::DateTime::parse_from_rfc3339(value).map_err(|_| invalid())?;
            let secs = u64::try_from(parsed.timestamp()).map_err(|_| invalid())?;
            schedule = schedule.with_activation(hardfork, Timestamp(secs));
        }
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ChainConfig = toml::from_str(
            r#"
            [parameters]
            maximum_authority_membership = 4
            referrer_mode_enabled = true

            [hardforks]
            abuse_accounting = "2020-01-01T00:00:00Z"
            "#,
        )
        .unwrap();
        assert_eq!(config.parameters.maximum_authority_membership, 4);
        assert!(config.parameters.referrer_mode_enabled);
        assert_eq!(
            config.parameters.accounts_per_fee_scale,
            ChainParameters::default().accounts_per_fee_scale
        );
        assert_eq!(config.logging.level, "info");

        let schedule = config.hardfork_schedule().unwrap();
        assert_eq!(
            schedule.gate(Hardfork::AbuseAccounting).activation,
            Timestamp(1_577_836_800)
        );
        assert_eq!(
            schedule.gate(Hardfork::Buyback),
            HardforkSchedule::mainnet().gate(Hardfork::Buyback)
        );
    }

    #[test]
    fn test_bad_overrides_rejected() {
        let mut config = ChainConfig::default();
        config.hardforks.insert("no_such_fork".into(), "2020-01-01T00:00:00Z".into());
        assert!(matches!(
            config.hardfork_schedule(),
            Err(ConfigError::UnknownHardfork(_))
        ));

        let mut config = ChainConfig::default();
        config.hardforks.insert("buyback".into(), "yesterday".into());
        assert!(matches!(
            config.hardfork_schedule(),
            Err(ConfigError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_load_rejects_invalid_parameters() {
        let path = std::env::temp_dir().join(format!("chain-params-{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();
        std::fs::write(&path, "[parameters]\nnetwork_percent_of_fee = 12000\n").unwrap();

        let result = ChainConfig::load(&path);
        let fallback = ChainConfig::load_or_default(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "network_percent_of_fee",
                ..
            })
        ));
        assert_eq!(fallback, ChainConfig::default());
    }

    #[test]
    fn test_default_written_when_missing() {
        let path = std::env::temp_dir().join(format!("chain-config-{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        let config = ChainConfig::load_or_default(&path);
        assert_eq!(config, ChainConfig::default());
        let reloaded = ChainConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
