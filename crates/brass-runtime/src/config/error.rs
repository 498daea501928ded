use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension has no provider in this build.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A source failed to parse, or the merged result did not fit the schema.
    #[error("Failed to read configuration: {0}")]
    Extract(#[source] Box<figment::Error>),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Invalid color for theme.colors.{key}: {value:?} (expected #rrggbb)")]
    InvalidColor { key: String, value: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
