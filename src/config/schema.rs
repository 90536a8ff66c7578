//! Configuration schema definitions.
//!
//! Every section carries `#[serde(default)]`, so a file only needs the keys
//! it wants to change.

use super::error::{ConfigError, ConfigResult};
use crate::port::{tables, FlowControl, Parity, SerialConfig, StopBits};
use crate::rs485::EnableLine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line defaults applied to every port opened through the config
    pub serial: SerialSection,
    /// Half-duplex turnaround settings
    pub rs485: Rs485Section,
    /// Hardware test harness settings
    pub testing: TestingSection,
    pub logging: LoggingSection,
}

impl Config {
    /// Check the serial settings against what the port layer accepts.
    pub fn validate(&self) -> ConfigResult<()> {
        tables::check_baud(self.serial.default_baud)
            .map_err(|e| ConfigError::serial_setting("serial.default_baud", e))?;
        tables::check_stop_bits(self.serial.stop_bits)
            .map_err(|e| ConfigError::serial_setting("serial.stop_bits", e))?;
        tables::check_baud(self.testing.baud)
            .map_err(|e| ConfigError::serial_setting("testing.baud", e))?;

        if let Some((alias, _)) = self
            .serial
            .port_aliases
            .iter()
            .find(|(_, target)| target.is_empty())
        {
            return Err(ConfigError::validation(
                format!("serial.port_aliases.{alias}"),
                "alias points to an empty device name",
            ));
        }
        Ok(())
    }
}

/// `[serial]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    pub default_baud: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Zero blocks until a byte arrives
    pub read_timeout_ms: u64,
    pub signal_invert: bool,
    /// Short names for device paths, e.g. `bus = "/dev/ttyUSB0"`
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            default_baud: 115200,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout_ms: 1000,
            signal_invert: false,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialSection {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Port configuration for `device` (or an alias) using these defaults.
    pub fn port_config(&self, device: &str) -> SerialConfig {
        SerialConfig::new(self.resolve_port(device))
            .baud_rate(self.default_baud)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .flow_control(self.flow_control)
            .read_timeout(self.read_timeout())
            .signal_invert(self.signal_invert)
    }
}

/// `[rs485]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rs485Section {
    pub enable_line: EnableLine,
    /// Driver settle time before the first byte, in microseconds
    pub delay_before_us: u64,
    /// Hold time after the write returns, in microseconds
    pub delay_after_us: u64,
}

impl Default for Rs485Section {
    fn default() -> Self {
        Self {
            enable_line: EnableLine::Rts,
            delay_before_us: 0,
            delay_after_us: 1000,
        }
    }
}

impl Rs485Section {
    pub fn delay_before(&self) -> Duration {
        Duration::from_micros(self.delay_before_us)
    }

    pub fn delay_after(&self) -> Duration {
        Duration::from_micros(self.delay_after_us)
    }
}

/// `[testing]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingSection {
    /// Device under test; hardware tests skip when unset
    pub port: Option<String>,
    pub baud: u32,
    /// TX is wired to RX (and RTS to CTS) on the test port
    pub loopback_enabled: bool,
    pub timeout_ms: u64,
}

impl Default for TestingSection {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115200,
            loopback_enabled: false,
            timeout_ms: 2000,
        }
    }
}

impl TestingSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 8N1 port configuration for the test port, if one is set.
    pub fn port_config(&self) -> Option<SerialConfig> {
        self.port.as_ref().map(|port| {
            SerialConfig::new(port.clone())
                .baud_rate(self.baud)
                .read_timeout(self.timeout())
        })
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}
