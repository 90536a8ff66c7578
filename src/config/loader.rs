//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use crate::rs485::EnableLine;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "EMBSERIAL";

/// Config file name
const CONFIG_FILE_NAME: &str = "embserial.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "EMBSERIAL_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `EMBSERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./embserial.toml` (current directory)
    /// 3. `embserial.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        debug!("Configuration loaded from {:?}", config_path);
        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Defaults plus environment overrides, no file.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("No config file path set".to_string()))?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Platform config directory for embserial (XDG, `~/Library`, `%APPDATA%`).
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "embserial").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// First set variable among `EMBSERIAL_<key>` and the legacy names.
fn env_value(key: &str, legacy: &[&str]) -> Option<(String, String)> {
    let primary = format!("{ENV_PREFIX}_{key}");
    std::iter::once(primary)
        .chain(legacy.iter().map(|name| name.to_string()))
        .find_map(|var| std::env::var(&var).ok().map(|val| (var, val)))
}

fn parse_env<T: FromStr>(var: &str, val: &str, message: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("{message}: {val:?}")))
}

fn parse_flag(var: &str, val: &str) -> ConfigResult<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::env_parse(var, format!("expected a boolean: {val:?}"))),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Variables follow the pattern `EMBSERIAL_<SECTION>_<KEY>`, for example
/// `EMBSERIAL_SERIAL_DEFAULT_BAUD=9600` or `EMBSERIAL_RS485_ENABLE_LINE=dtr`.
/// The hardware-test harness variables `TEST_PORT`, `TEST_BAUD` and
/// `TEST_LOOPBACK` are honoured as fallbacks for the `[testing]` keys.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((var, val)) = env_value("SERIAL_DEFAULT_BAUD", &[]) {
        config.serial.default_baud = parse_env(&var, &val, "Invalid baud rate")?;
    }
    if let Some((var, val)) = env_value("SERIAL_READ_TIMEOUT_MS", &[]) {
        config.serial.read_timeout_ms = parse_env(&var, &val, "Invalid timeout")?;
    }
    if let Some((var, val)) = env_value("SERIAL_SIGNAL_INVERT", &[]) {
        config.serial.signal_invert = parse_flag(&var, &val)?;
    }

    if let Some((var, val)) = env_value("RS485_ENABLE_LINE", &[]) {
        config.rs485.enable_line = match val.trim().to_ascii_lowercase().as_str() {
            "rts" => EnableLine::Rts,
            "dtr" => EnableLine::Dtr,
            _ => return Err(ConfigError::env_parse(var, "expected \"rts\" or \"dtr\"")),
        };
    }
    if let Some((var, val)) = env_value("RS485_DELAY_BEFORE_US", &[]) {
        config.rs485.delay_before_us = parse_env(&var, &val, "Invalid delay")?;
    }
    if let Some((var, val)) = env_value("RS485_DELAY_AFTER_US", &[]) {
        config.rs485.delay_after_us = parse_env(&var, &val, "Invalid delay")?;
    }

    if let Some((_, val)) = env_value("TESTING_PORT", &["TEST_PORT"]) {
        config.testing.port = Some(val).filter(|p| !p.is_empty());
    }
    if let Some((var, val)) = env_value("TESTING_BAUD", &["TEST_BAUD"]) {
        config.testing.baud = parse_env(&var, &val, "Invalid baud rate")?;
    }
    if let Some((var, val)) = env_value("TESTING_LOOPBACK", &["TEST_LOOPBACK"]) {
        config.testing.loopback_enabled = parse_flag(&var, &val)?;
    }
    if let Some((var, val)) = env_value("TESTING_TIMEOUT_MS", &["TEST_TIMEOUT"]) {
        config.testing.timeout_ms = parse_env(&var, &val, "Invalid timeout")?;
    }

    if let Some((_, val)) = env_value("LOGGING_LEVEL", &[]) {
        config.logging.level = val;
    }

    Ok(())
}
