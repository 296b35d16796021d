//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Config file: `--config PATH`, else `$XDG_CONFIG_HOME/techtree/techtree.toml`
//! 3. Environment variables: `TECHTREE_*` prefix

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Unified configuration for techtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Catalog file (default: ~/.techtree/catalog.json)
    pub store: PathBuf,
    /// Show component identities in tree output
    pub show_ids: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: default_store_path(),
            show_ids: true,
        }
    }
}

/// Raw settings for intermediate parsing (None means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store: Option<PathBuf>,
    pub show_ids: Option<bool>,
}

fn default_store_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".techtree").join("catalog.json"))
        .unwrap_or_else(|| PathBuf::from("~/.techtree/catalog.json"))
}

/// Get the XDG config directory for techtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "techtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("techtree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`. Unknown variables leave the input unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn expand_paths(&mut self) {
        self.store = expand_path(&self.store);
    }

    /// Scalar options: overlay wins if specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store: overlay.store.clone().unwrap_or_else(|| self.store.clone()),
            show_ids: overlay.show_ids.unwrap_or(self.show_ids),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `config_file` replaces the global config file; unlike the global file it must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        match config_file {
            Some(path) => {
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                if let Some(global_path) = global_config_path() {
                    if global_path.exists() {
                        debug!("loading config from {}", global_path.display());
                        current = current.merge_with(&load_raw_settings(&global_path)?);
                    }
                }
            }
        }

        current = Self::apply_env_overrides(current, None)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply TECHTREE_* environment variables as explicit overrides.
    ///
    /// `vars` stands in for the process environment when given.
    fn apply_env_overrides(
        mut settings: Self,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TECHTREE")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store") {
            settings.store = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("show_ids") {
            settings.show_ids = val;
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# techtree configuration
#
# Locations (by precedence, lowest to highest):
#   File: ~/.config/techtree/techtree.toml (or --config PATH)
#   Env:  TECHTREE_* environment variables (explicit overrides)

# Catalog file holding technologies, operations and structure usages
# store = "~/.techtree/catalog.json"

# Show component identities in tree output
# show_ids = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_overrides_when_defaulting_then_store_is_in_home() {
        let settings = Settings::default();
        assert!(settings.store.ends_with(".techtree/catalog.json"));
        assert!(settings.show_ids);
    }

    #[test]
    fn given_tilde_in_store_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            store: PathBuf::from("~/catalogs/main.json"),
            show_ids: false,
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let store = settings.store.to_string_lossy();
        assert!(store.starts_with(&home), "store should start with home: {}", store);
        assert!(!store.contains('~'));
    }

    #[test]
    fn given_env_vars_when_applying_overrides_then_replace_file_values() {
        let base = Settings {
            store: PathBuf::from("/from/file.json"),
            show_ids: true,
        };
        let vars = HashMap::from([
            ("TECHTREE_STORE".to_string(), "/from/env.json".to_string()),
            ("TECHTREE_SHOW_IDS".to_string(), "false".to_string()),
        ]);

        let settings = Settings::apply_env_overrides(base, Some(vars)).unwrap();

        assert_eq!(settings.store, PathBuf::from("/from/env.json"));
        assert!(!settings.show_ids);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let base = Settings::default();
        let overlay = RawSettings {
            store: None,
            show_ids: Some(false),
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.store, base.store);
        assert!(!merged.show_ids);
    }

    #[test]
    fn given_settings_when_to_toml_then_parses_back() {
        let settings = Settings {
            store: PathBuf::from("/tmp/catalog.json"),
            show_ids: false,
        };
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
