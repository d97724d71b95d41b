//! Configuration loading
//!
//! Priority order (highest first):
//! 1. Command-line argument (applied by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: the session starts on defaults with a
//! warning. A file that exists but does not parse is.

use crate::ranking::DEFAULT_TOP_K;
use crate::scan::CodeNormalization;
use crate::target::InitialTarget;
use crate::viewport::ZoomSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML file
pub const ENV_CONFIG: &str = "TASTEMAP_CONFIG";
/// Environment override for the coordinates table location
pub const ENV_COORDINATES: &str = "TASTEMAP_COORDINATES";
/// Environment override for the metadata table location
pub const ENV_METADATA: &str = "TASTEMAP_METADATA";
/// Environment override for the list length
pub const ENV_TOP_K: &str = "TASTEMAP_TOP_K";

/// Catalog table locations; each is a file path or an http(s) URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub coordinates: String,
    pub metadata: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            coordinates: "pca_result.csv".to_string(),
            metadata: "Merged_TasteDataDB15.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `tastemap.toml`; every field is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub top_k: usize,
    pub initial_target: InitialTarget,
    pub code_normalization: CodeNormalization,
    pub catalog: CatalogConfig,
    pub zoom: ZoomSettings,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            initial_target: InitialTarget::default(),
            code_normalization: CodeNormalization::default(),
            catalog: CatalogConfig::default(),
            zoom: ZoomSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".to_string()));
        }
        let zoom = &self.zoom;
        if !(zoom.min > 0.0 && zoom.min <= zoom.max) {
            return Err(Error::Config(format!(
                "zoom limits invalid: min {} max {}",
                zoom.min, zoom.max
            )));
        }
        if !(zoom.step > 0.0) {
            return Err(Error::Config(format!("zoom step must be positive, got {}", zoom.step)));
        }
        if !zoom.is_valid() {
            return Err(Error::Config(format!(
                "zoom settings must be finite: initial {} step {} max {}",
                zoom.initial, zoom.step, zoom.max
            )));
        }
        if self.catalog.coordinates.trim().is_empty() || self.catalog.metadata.trim().is_empty() {
            return Err(Error::Config("catalog locations must not be empty".to_string()));
        }
        Ok(())
    }

    /// Overlay environment variables onto the file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(coordinates) = std::env::var(ENV_COORDINATES) {
            self.catalog.coordinates = coordinates;
        }
        if let Ok(metadata) = std::env::var(ENV_METADATA) {
            self.catalog.metadata = metadata;
        }
        if let Ok(top_k) = std::env::var(ENV_TOP_K) {
            self.top_k = top_k
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a count: {}", ENV_TOP_K, top_k)))?;
        }
        self.validate()
    }
}

/// `<config_dir>/tastemap/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tastemap").join("config.toml"))
}

/// Resolve which TOML file to read
///
/// Command-line path first, then `TASTEMAP_CONFIG`, then the platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }
    default_config_path()
}

/// File (if any) plus environment overrides
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) => TomlConfig::load(&path)?,
        None => {
            warn!("No config directory on this platform, using defaults");
            TomlConfig::default()
        }
    };
    config.apply_env_overrides()?;
    Ok(config)
}
