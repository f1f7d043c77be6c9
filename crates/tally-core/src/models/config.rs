//! Application configuration

use crate::models::Zone;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub backend: BackendConfig,
    pub log_level: String,
    /// Directory exports are written to; the working directory when unset
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    /// IANA zone name; the system zone when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Location of the hosted identity and data service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.zone()?;

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    pub fn zone(&self) -> Result<Zone> {
        match self.timezone {
            Some(ref name) => Zone::parse(name),
            None => Ok(Zone::Local),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            backend: BackendConfig::default(),
            log_level: "info".to_string(),
            export_dir: None,
            timezone: None,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url) = self.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Validation(format!(
                    "Backend URL must start with http:// or https:// (got '{}')",
                    url
                )));
            }
        }

        if let Some(ref key) = self.anon_key {
            if key.trim().is_empty() {
                return Err(Error::Validation("Backend key cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }
}
