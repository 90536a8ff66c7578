//! Configuration error types for the config module.

use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read configuration file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Failed to write config file
    #[error("Failed to write configuration file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    /// A serial setting the port layer would refuse at open time
    #[error("Invalid serial setting '{key}': {source}")]
    SerialSetting {
        key: &'static str,
        #[source]
        source: PortError,
    },

    /// Environment variable parse error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParseError { var: String, message: String },

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl ConfigError {
    /// Create a validation error
    pub fn validation<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap a port-layer rejection of the setting at `key`
    pub fn serial_setting(key: &'static str, source: PortError) -> Self {
        Self::SerialSetting { key, source }
    }

    /// Create an env parse error
    pub fn env_parse<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = ConfigError::validation("serial.default_baud", "unsupported baud rate 76800");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'serial.default_baud': unsupported baud rate 76800"
        );
    }

    #[test]
    fn test_serial_setting_keeps_source() {
        let err = ConfigError::serial_setting(
            "testing.baud",
            PortError::invalid_config("unsupported baud rate 76800"),
        );
        assert!(err.to_string().starts_with("Invalid serial setting 'testing.baud'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parse_error_from_toml() {
        let err: ConfigError = toml::from_str::<toml::Value>("[serial\n").unwrap_err().into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
