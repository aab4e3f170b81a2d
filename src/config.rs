//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/fraudtree/fraudtree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `FRAUDTREE_*` prefix
//!
//! Command line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, Map};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::builder::{DEFAULT_LEAF_SENTINEL, DEFAULT_MAX_DEPTH};
use crate::domain::enrichment::DEFAULT_DATE_FORMATS;
use crate::domain::UnknownAttributePolicy;

/// Unified configuration for fraudtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of split levels in a built tree
    pub max_depth: usize,
    /// Attribute answer that marks a node as a leaf
    pub leaf_sentinel: String,
    /// Name of the prediction column appended on export
    pub results_column: String,
    /// Date formats tried in order for `Trans Date`
    pub date_formats: Vec<String>,
    /// Evaluation of a split whose attribute the record lacks
    pub unknown_attribute: UnknownAttributePolicy,
    /// Directory relative output paths are resolved against
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            leaf_sentinel: DEFAULT_LEAF_SENTINEL.to_string(),
            results_column: "results".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            unknown_attribute: UnknownAttributePolicy::default(),
            output_dir: None,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified, inherit").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub max_depth: Option<usize>,
    pub leaf_sentinel: Option<String>,
    pub results_column: Option<String>,
    pub date_formats: Option<Vec<String>>,
    pub unknown_attribute: Option<UnknownAttributePolicy>,
    pub output_dir: Option<PathBuf>,
}

/// Get the XDG config directory for fraudtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fraudtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("fraudtree.toml"))
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

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Overlay wins where it specifies a value; lists are replaced, not merged.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            max_depth: overlay.max_depth.unwrap_or(self.max_depth),
            leaf_sentinel: overlay
                .leaf_sentinel
                .clone()
                .unwrap_or_else(|| self.leaf_sentinel.clone()),
            results_column: overlay
                .results_column
                .clone()
                .unwrap_or_else(|| self.results_column.clone()),
            date_formats: overlay
                .date_formats
                .clone()
                .unwrap_or_else(|| self.date_formats.clone()),
            unknown_attribute: overlay.unknown_attribute.unwrap_or(self.unknown_attribute),
            output_dir: overlay
                .output_dir
                .clone()
                .or_else(|| self.output_dir.clone()),
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(dir) = &self.output_dir {
            self.output_dir = Some(PathBuf::from(expand_env_vars(&dir.to_string_lossy())));
        }
    }

    /// Reject values the engine cannot work with.
    fn validate(&self) -> Result<(), ApplicationError> {
        if self.leaf_sentinel.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "leaf_sentinel must not be empty".into(),
            });
        }
        if self.results_column.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "results_column must not be empty".into(),
            });
        }
        if self.date_formats.is_empty() {
            return Err(ApplicationError::Config {
                message: "date_formats must list at least one format".into(),
            });
        }
        Ok(())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = current.apply_env_overrides(None)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply FRAUDTREE_* variables as explicit overrides.
    ///
    /// `vars` stands in for the process environment when given. A variable
    /// that is set but does not parse is a config error.
    pub fn apply_env_overrides(
        mut self,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("FRAUDTREE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(";")
                .with_list_parse_key("date_formats")
                .try_parsing(true)
                .source(vars),
        );

        let config = builder.build().map_err(config_err)?;

        if let Some(val) = env_value(&config, "max_depth")? {
            self.max_depth = val;
        }
        if let Some(val) = env_value(&config, "leaf_sentinel")? {
            self.leaf_sentinel = val;
        }
        if let Some(val) = env_value(&config, "results_column")? {
            self.results_column = val;
        }
        if let Some(val) = env_value(&config, "date_formats")? {
            self.date_formats = val;
        }
        if let Some(val) = env_value(&config, "unknown_attribute")? {
            self.unknown_attribute = val;
        }
        if let Some(val) = env_value::<String>(&config, "output_dir")? {
            self.output_dir = Some(PathBuf::from(val));
        }

        Ok(self)
    }

    /// Resolve an output path against `output_dir` when it is relative.
    pub fn resolve_output(&self, path: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# fraudtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/fraudtree/fraudtree.toml
#   Explicit: --config <file>
#   Env:      FRAUDTREE_* environment variables (date formats separated by ';')

# Maximum number of split levels while building a tree
# max_depth = 32

# Attribute answer that turns the current node into a leaf
# leaf_sentinel = "result"

# Column holding the predicted label in exports
# results_column = "results"

# Formats tried in order for the "Trans Date" column
# date_formats = ["%d %b %Y", "%d-%b-%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %B %Y"]

# Split on an attribute the records lack: "right" follows the right branch, "error" aborts
# unknown_attribute = "right"

# Relative output paths are written below this directory
# output_dir = "~/fraudtree"
"#
        .to_string()
    }
}

/// `None` when the variable is unset.
fn env_value<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("FRAUDTREE_{}: {}", key.to_uppercase(), e),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
