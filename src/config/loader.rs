use crate::config::schema::{UpdaterConfig, ValidationError};
use crate::error::ErrorKind;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load an [`UpdaterConfig`]. Parse and validation failures carry
/// the file they came from once [`load_from_path`] knows it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read updater config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("updater config{} is not valid TOML: {source}", location(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("updater config{} failed validation: {source}", location(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io { .. } => ErrorKind::FileSystem,
            ConfigError::Toml { .. } => ErrorKind::Syntax,
            ConfigError::Validation { .. } => ErrorKind::Validation,
        }
    }

    fn at(self, file: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(file.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(file.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<UpdaterConfig, ConfigError> {
    let config: UpdaterConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<UpdaterConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.at(path))
}
