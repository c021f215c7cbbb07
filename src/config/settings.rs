//! TOML-based configuration for Quarry.
//!
//! Example configuration:
//! ```toml
//! [dialect]
//! name = "postgres"          # or "${QUARRY_DIALECT}"
//!
//! [dialect.overrides]
//! join_using = false         # force USING joins to be rewritten
//! cte_in_subqueries = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::{Capabilities, CapabilityOverrides, Dialect};

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV_VAR: &str = "QUARRY_CONFIG";

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_]+)\}|\$([A-Za-z0-9_]+)").unwrap()
});

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub dialect: DialectSettings,
}

/// Target dialect and per-flag capability overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DialectSettings {
    /// Built-in dialect name (supports `${ENV_VAR}` expansion).
    pub name: String,

    pub overrides: CapabilityOverrides,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            name: Dialect::default().to_string(),
            overrides: CapabilityOverrides::default(),
        }
    }
}

impl DialectSettings {
    /// Resolve the configured name to a built-in dialect.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        let name = expand_env_vars(&self.name)?;
        Dialect::from_name(name.trim()).ok_or(SettingsError::UnsupportedDialect(name))
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Capability flags for the configured dialect, overrides applied.
    pub fn capabilities(&self) -> Result<Capabilities, SettingsError> {
        let dialect = self.dialect.dialect()?;
        Ok(Capabilities::from(dialect).with_overrides(&self.dialect.overrides))
    }
}

/// Expand `${VAR}` and `$VAR` references.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;
    for caps in ENV_REF.captures_iter(s) {
        let (Some(whole), Some(var)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let value = env::var(var.as_str())
            .map_err(|_| SettingsError::MissingEnvVar(var.as_str().to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&s[last..]);
    Ok(result)
}
