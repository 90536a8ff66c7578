//! Configuration module for embserial.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `EMBSERIAL_CONFIG` environment variable (explicit path)
//! 2. `./embserial.toml` (current directory)
//! 3. `embserial.toml` in the platform config directory
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Values can be overridden with `EMBSERIAL_<SECTION>_<KEY>`:
//! - `EMBSERIAL_SERIAL_DEFAULT_BAUD=9600`
//! - `EMBSERIAL_RS485_DELAY_AFTER_US=500`
//! - `EMBSERIAL_TESTING_PORT=/dev/ttyUSB0`
//!
//! The hardware test harness variables `TEST_PORT`, `TEST_BAUD` and
//! `TEST_LOOPBACK` are also read.
//!
//! # Example
//!
//! ```rust,no_run
//! use embserial::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let port_config = loader.config().serial.port_config("bus");
//! println!("{} at {} baud", port_config.name, port_config.baud_rate);
//! # Ok::<(), embserial::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingSection, Rs485Section, SerialSection, TestingSection};
