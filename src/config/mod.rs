//! Configuration module for Quarry.
//!
//! Resolves the dialect capability flags a [`Query`](crate::query::Query)
//! is built with from a TOML settings file.

mod settings;

pub use settings::{DialectSettings, Settings, SettingsError, CONFIG_ENV_VAR};
