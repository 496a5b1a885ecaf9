/// Service configuration loaded from TOML.
///
/// Relative paths in the file are resolved against the directory holding
/// the configuration file, so a config can travel with its data.
///
/// ```toml
/// levels_file = "levels.toml"        # optional, built-in NO2 table otherwise
/// stations_file = "data/stations.json"
/// zones_file = "data/zones.json"
/// output_file = "map_layers.json"    # optional, stdout otherwise
///
/// [logging]
/// level = "info"
/// file = "aqmap.log"
/// timestamps = true
/// ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::logging::LogLevel;
use crate::model::LoadError;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub levels_file: Option<PathBuf>,
    pub stations_file: PathBuf,
    pub zones_file: PathBuf,
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: LogLevel,
    pub file: Option<String>,
    #[serde(default)]
    pub timestamps: bool,
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            file: None,
            timestamps: false,
        }
    }
}

impl ServiceConfig {
    /// Rebases every relative path onto `base`.
    fn rebase(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.levels_file = self.levels_file.map(join);
        self.stations_file = join(self.stations_file);
        self.zones_file = join(self.zones_file);
        self.output_file = self.output_file.map(join);
        self
    }
}

/// Parses configuration text; `path` is used for relative paths and errors.
pub fn parse_config(text: &str, path: &Path) -> Result<ServiceConfig, LoadError> {
    let config: ServiceConfig = toml::from_str(text).map_err(|source| LoadError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.rebase(base))
}

pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text, path)
}
