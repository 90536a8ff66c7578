//! Utility functions for hardware testing.
//!
//! Test port selection comes from the `[testing]` configuration section,
//! which also reads `TEST_PORT`, `TEST_BAUD` and `TEST_LOOPBACK`.

use embserial::config::{ConfigLoader, TestingSection};
use embserial::port::{self, NativePort, Port, SerialConfig};
use serialport::{available_ports, SerialPortType};
use std::time::{Duration, Instant};

/// Test port settings, or `None` when no test port is configured.
pub fn testing() -> Option<TestingSection> {
    let loader = match ConfigLoader::load() {
        Ok(loader) => loader,
        Err(e) => {
            println!("Configuration error: {}", e);
            return None;
        }
    };
    let testing = loader.into_config().testing;
    testing.port.is_some().then_some(testing)
}

/// Print available ports for debugging.
pub fn print_available_ports() {
    let ports = available_ports().unwrap_or_default();
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return;
    }

    println!("Available serial ports ({}):", ports.len());
    for (idx, port) in ports.iter().enumerate() {
        match &port.port_type {
            SerialPortType::UsbPort(usb) => println!(
                "  {}. {} USB {:04x}:{:04x} {}",
                idx + 1,
                port.port_name,
                usb.vid,
                usb.pid,
                usb.manufacturer.as_deref().unwrap_or("")
            ),
            other => println!("  {}. {} {:?}", idx + 1, port.port_name, other),
        }
    }
}

/// Test fixture owning an open port on the configured test device.
pub struct PortTestFixture {
    pub port: NativePort,
    pub testing: TestingSection,
}

impl PortTestFixture {
    /// Open the test port with the `[testing]` defaults (8N1).
    pub fn setup() -> Option<Self> {
        let testing = testing()?;
        let config = testing.port_config()?;
        Self::with_config(testing, config)
    }

    /// Open the test port with a custom line configuration.
    pub fn setup_with(adjust: impl FnOnce(SerialConfig) -> SerialConfig) -> Option<Self> {
        let testing = testing()?;
        let config = adjust(testing.port_config()?);
        Self::with_config(testing, config)
    }

    fn with_config(testing: TestingSection, config: SerialConfig) -> Option<Self> {
        println!(
            "Setting up test fixture for {} at {} baud",
            config.name, config.baud_rate
        );
        match port::open(&config) {
            Ok(port) => Some(Self { port, testing }),
            Err(e) => {
                print_available_ports();
                panic!("Failed to open {}: {}", config.name, e);
            }
        }
    }

    pub fn is_loopback(&self) -> bool {
        self.testing.loopback_enabled
    }

    /// Read until `len` bytes arrived or the test timeout passed.
    pub fn read_exact(&self, len: usize) -> Vec<u8> {
        read_exact(&self.port, len, self.testing.timeout())
    }
}

impl Drop for PortTestFixture {
    fn drop(&mut self) {
        if self.port.is_open() {
            let _ = self.port.close();
        }
    }
}

pub fn read_exact(port: &dyn Port, len: usize, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::with_capacity(len);
    let mut buffer = [0u8; 256];
    while out.len() < len && Instant::now() < deadline {
        let want = (len - out.len()).min(buffer.len());
        match port.read(&mut buffer[..want]) {
            Ok(n) => out.extend_from_slice(&buffer[..n]),
            Err(e) => panic!("read failed: {}", e),
        }
    }
    out
}

/// Skip test with a clear message if hardware is not available.
#[macro_export]
macro_rules! skip_without_hardware {
    () => {
        if $crate::hardware::utils::testing().is_none() {
            println!("Skipping: TEST_PORT environment variable not set");
            println!("   Set TEST_PORT=COM3 (or /dev/ttyUSB0) to run hardware tests");
            return;
        }
    };
}

/// Skip test with a clear message if loopback is not enabled.
#[macro_export]
macro_rules! skip_without_loopback {
    () => {
        match $crate::hardware::utils::testing() {
            Some(t) if t.loopback_enabled => {}
            Some(_) => {
                println!("Skipping: TEST_LOOPBACK not set");
                println!("   This test requires TX-RX, RTS-CTS and DTR-DSR jumpers");
                return;
            }
            None => {
                println!("Skipping: TEST_PORT environment variable not set");
                return;
            }
        }
    };
}
