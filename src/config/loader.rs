use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

/// Filenames probed in the working directory when no --config flag is given.
const DEFAULT_CONFIG_FILES: [&str; 2] = ["phaseload.toml", "phaseload.json"];

/// True when one of the default config files exists in the working directory.
pub(crate) fn default_config_present() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|name| Path::new(name).exists())
}

/// Loads a configuration file from the provided path or default locations.
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<Option<ConfigFile>> {
    let candidate = path.map_or_else(
        || {
            DEFAULT_CONFIG_FILES
                .iter()
                .map(PathBuf::from)
                .find(|name| name.exists())
        },
        |explicit| Some(PathBuf::from(explicit)),
    );
    candidate.map(|file| load_config_file(&file)).transpose()
}

pub(crate) fn load_config_file(path: &Path) -> AppResult<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    parse_config(path, &content)
}

fn parse_config(path: &Path, content: &str) -> AppResult<ConfigFile> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| AppError::config(ConfigError::MissingExtension))?;
    match extension {
        "toml" => toml::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        "json" => serde_json::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        other => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: other.to_owned(),
        })),
    }
}
