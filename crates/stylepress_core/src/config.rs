//! Pipeline configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jsonc_parser::ParseOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Configuration for the transform pipeline.
///
/// Every field is optional in the file. A project without a configuration
/// file gets [`PipelineConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Compiler search paths.
    #[serde(default)]
    pub include_paths: Vec<String>,

    /// Files imported ahead of every compiled source.
    #[serde(default)]
    pub import_files: Vec<String>,

    /// Options forwarded verbatim to the compiler.
    #[serde(default, alias = "stylusOptions")]
    pub compiler_options: serde_json::Map<String, serde_json::Value>,

    /// Browserslist queries used to decide which prefixes are needed.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Whether the prefixer emits minified CSS.
    #[serde(default)]
    pub minify: bool,

    /// Whether artifacts carry an inline source map.
    #[serde(default = "default_source_map")]
    pub source_map: bool,

    /// Maximum number of cached transforms. `0` disables the bound.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Time limit for each of the compile and prefix stages.
    #[serde(default)]
    pub stage_timeout_ms: Option<u64>,

    /// Directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}

fn default_source_map() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    stylepress_cache::DEFAULT_CAPACITY
}

impl PipelineConfig {
    /// Configuration file names, in lookup order.
    pub const CONFIG_FILES: &'static [&'static str] =
        &["stylepress.config.jsonc", "stylepress.config.json"];

    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self {
            include_paths: Vec::new(),
            import_files: Vec::new(),
            compiler_options: serde_json::Map::new(),
            browsers: default_browsers(),
            minify: false,
            source_map: default_source_map(),
            cache_capacity: default_cache_capacity(),
            stage_timeout_ms: None,
            base_dir: None,
        }
    }

    /// Finds the first configuration file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let mut config = Self::from_json(&content)?;
        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    /// Parses configuration from a JSON string. Comments and trailing commas
    /// are accepted.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
                .map_err(|e| ConfigError::parse(e.to_string()))?
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        serde_json::from_value(value).map_err(|e| ConfigError::invalid(e.to_string()))
    }

    /// Loads the configuration of the project rooted at `dir`.
    ///
    /// Returns `Ok(None)` when no configuration file exists, and an error
    /// when one exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::discover(dir) else {
            return Ok(None);
        };

        debug!("Found config file: {}", path.display());
        match Self::from_file(&path) {
            Ok(config) => Ok(Some(config)),
            // Removed between discovery and read.
            Err(ConfigError::Read(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Loads the configuration of the project rooted at `dir`, falling back
    /// to defaults.
    ///
    /// A missing file is not an error. A file that is present but broken is
    /// logged as a warning and ignored.
    pub fn load_or_default(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("No config file in {}, using defaults", dir.display());
                Self::default()
            }
            Err(e) => {
                warn!(
                    "Ignoring config in {}, using defaults: {}",
                    dir.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Returns `include_paths` with relative entries resolved against the
    /// directory of the configuration file.
    ///
    /// Without a `base_dir` the paths are returned unchanged.
    pub fn resolved_include_paths(&self) -> Vec<String> {
        let Some(base_dir) = &self.base_dir else {
            return self.include_paths.clone();
        };

        self.include_paths
            .iter()
            .map(|include_path| {
                let path = Path::new(include_path);
                if path.is_absolute() {
                    include_path.clone()
                } else {
                    base_dir.join(path).to_string_lossy().into_owned()
                }
            })
            .collect()
    }

    /// Returns the per-stage time limit, if one is configured.
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
