//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/weaktree/weaktree.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `WEAKTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{CleanupMode, TraversalOrder};

/// Unified configuration for weaktree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Cleanup mode given to sample tree nodes
    pub default_mode: CleanupMode,
    /// Walk order when none is given on the command line
    pub order: TraversalOrder,
    /// Render nodes whose value expired
    pub show_expired: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_mode: CleanupMode::Default,
            order: TraversalOrder::Breadth,
            show_expired: true,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub default_mode: Option<CleanupMode>,
    pub order: Option<TraversalOrder>,
    pub show_expired: Option<bool>,
}

/// Get the XDG config directory for weaktree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "weaktree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("weaktree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path; unexpandable input is kept as is.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ApplicationResult<RawSettings> {
    let content = std::fs::read_to_string(path).with_path_context("read config", path)?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn env_source() -> Environment {
    Environment::with_prefix("WEAKTREE")
        .prefix_separator("_")
        .separator("__")
}

/// A missing key is `None`; any other lookup failure is an error.
fn env_value<T>(lookup: Result<T, ConfigError>) -> ApplicationResult<Option<T>> {
    match lookup {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins wherever it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            default_mode: overlay.default_mode.unwrap_or(self.default_mode),
            order: overlay.order.unwrap_or(self.order),
            show_expired: overlay.show_expired.unwrap_or(self.show_expired),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; unlike the global file it must exist
    #[instrument(level = "debug")]
    pub fn load(explicit: Option<&Path>) -> ApplicationResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            let path = expand_path(path);
            debug!(path = %path.display(), "loading explicit config");
            current = current.merge_with(&load_raw_settings(&path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply WEAKTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> ApplicationResult<Self> {
        Self::apply_env_source(settings, env_source())
    }

    /// Unparsable values are errors, never silently skipped.
    fn apply_env_source(mut settings: Self, source: Environment) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Some(val) = env_value(config.get_string("default_mode"))? {
            settings.default_mode = val.parse()?;
        }
        if let Some(val) = env_value(config.get_string("order"))? {
            settings.order = val.parse()?;
        }
        if let Some(val) = env_value(config.get_bool("show_expired"))? {
            settings.show_expired = val;
        }

        Ok(settings)
    }

    /// Serialize as TOML for display.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(vars))
    }

    #[test]
    fn given_env_vars_when_applied_then_override_settings() {
        let settings = Settings::apply_env_source(
            Settings::default(),
            env(&[
                ("WEAKTREE_DEFAULT_MODE", "reparent"),
                ("WEAKTREE_ORDER", "depth"),
                ("WEAKTREE_SHOW_EXPIRED", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.default_mode, CleanupMode::Reparent);
        assert_eq!(settings.order, TraversalOrder::Depth);
        assert!(!settings.show_expired);
    }

    #[test]
    fn given_no_env_vars_when_applied_then_settings_unchanged() {
        let settings = Settings::apply_env_source(Settings::default(), env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn given_unparsable_show_expired_when_applied_then_config_error() {
        let result = Settings::apply_env_source(
            Settings::default(),
            env(&[("WEAKTREE_SHOW_EXPIRED", "maybe")]),
        );
        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_unknown_mode_in_env_when_applied_then_errors() {
        let result = Settings::apply_env_source(
            Settings::default(),
            env(&[("WEAKTREE_DEFAULT_MODE", "shred")]),
        );
        assert!(matches!(result, Err(ApplicationError::Tree(_))));
    }

    #[test]
    fn given_empty_overlay_when_merging_then_keeps_base() {
        let base = Settings::default();
        assert_eq!(base.merge_with(&RawSettings::default()), base);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_only_overrides_given_fields() {
        let overlay = RawSettings {
            default_mode: Some(CleanupMode::Reparent),
            ..RawSettings::default()
        };
        let merged = Settings::default().merge_with(&overlay);
        assert_eq!(merged.default_mode, CleanupMode::Reparent);
        assert_eq!(merged.order, TraversalOrder::Breadth);
        assert!(merged.show_expired);
    }

    #[test]
    fn given_settings_when_serialized_then_uses_kebab_case_values() {
        let settings = Settings {
            default_mode: CleanupMode::NoCleanup,
            order: TraversalOrder::ToRoot,
            show_expired: false,
        };
        let toml = settings.to_toml().unwrap();
        assert!(toml.contains("default_mode = \"no-cleanup\""));
        assert!(toml.contains("order = \"to-root\""));
    }
}
