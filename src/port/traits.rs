//! Core traits for serial port abstraction.
//!
//! Defines the [`Port`] capability contract shared by every backend, and the
//! [`SerialConfig`] a port is opened with.

use super::error::{PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration parameters for a serial line.
///
/// Data size is always eight bits. A port keeps its own copy of the config it
/// was opened with, so changing this value afterwards has no effect on an open
/// port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`) or name (`COM3`).
    pub name: String,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Read timeout. Zero blocks until at least one byte arrives.
    pub read_timeout: Duration,

    /// Invert the logic level of every modem line read or written.
    pub signal_invert: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            baud_rate: 9600,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout: Duration::ZERO,
            signal_invert: false,
        }
    }
}

impl SerialConfig {
    /// Config for `name` with 9600 8N1 and no flow control.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn signal_invert(mut self, signal_invert: bool) -> Self {
        self.signal_invert = signal_invert;
        self
    }
}

/// Parity checking modes.
///
/// `Mark` and `Space` always set the parity bit to `1` or `0` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl TryFrom<u8> for Parity {
    type Error = PortError;

    fn try_from(code: u8) -> PortResult<Self> {
        match code {
            0 => Ok(Parity::None),
            1 => Ok(Parity::Odd),
            2 => Ok(Parity::Even),
            3 => Ok(Parity::Mark),
            4 => Ok(Parity::Space),
            other => Err(PortError::invalid_config(format!(
                "unknown parity code {other}"
            ))),
        }
    }
}

/// Number of stop bits.
///
/// `OnePointFive` is accepted here but refused when a port is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = PortError;

    /// Accepts `1`, `15` (one and a half) and `2`.
    fn try_from(code: u8) -> PortResult<Self> {
        match code {
            1 => Ok(StopBits::One),
            15 => Ok(StopBits::OnePointFive),
            2 => Ok(StopBits::Two),
            other => Err(PortError::invalid_config(format!(
                "unknown stop bits code {other}"
            ))),
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Hardware,
    /// XON/XOFF, enforced by the OS driver.
    Software,
}

impl TryFrom<u8> for FlowControl {
    type Error = PortError;

    fn try_from(code: u8) -> PortResult<Self> {
        match code {
            0 => Ok(FlowControl::None),
            1 => Ok(FlowControl::Hardware),
            2 => Ok(FlowControl::Software),
            other => Err(PortError::invalid_config(format!(
                "unknown flow control code {other}"
            ))),
        }
    }
}

/// The operation set every serial backend implements.
///
/// All methods take `&self`: backends lock internally, so a port can be
/// shared (for example through an [`Arc`]) between a reader, a writer and
/// something toggling modem lines.
pub trait Port: Send + Sync + std::fmt::Debug {
    /// Device name the port was opened with.
    fn name(&self) -> &str;

    /// Copy of the configuration currently in effect.
    fn config(&self) -> SerialConfig;

    /// Whether the port still owns an open handle.
    fn is_open(&self) -> bool;

    /// Read into `buffer`, returning the number of bytes read.
    ///
    /// A zero-length result means the configured read timeout expired.
    fn read(&self, buffer: &mut [u8]) -> PortResult<usize>;

    /// Write `data`, returning the number of bytes accepted by the driver.
    fn write(&self, data: &[u8]) -> PortResult<usize>;

    /// Release the handle. A second call fails.
    fn close(&self) -> PortResult<()>;

    /// Drive RTS. `true` asserts the line (subject to signal inversion).
    fn rts(&self, enable: bool) -> PortResult<()>;

    /// Drive DTR. `true` asserts the line (subject to signal inversion).
    fn dtr(&self, enable: bool) -> PortResult<()>;

    fn cts(&self) -> PortResult<bool>;

    fn dsr(&self) -> PortResult<bool>;

    fn ring(&self) -> PortResult<bool>;

    /// Change the baud rate, keeping parity, stop bits and flow control.
    fn set_baud(&self, baud_rate: u32) -> PortResult<()>;

    /// Turn modem-line inversion on or off for subsequent line operations.
    fn signal_invert(&self, enable: bool) -> PortResult<()>;

    /// Assert (`true`) or clear (`false`) a break condition on TX.
    fn send_break(&self, enable: bool) -> PortResult<()>;
}

macro_rules! forward_port {
    ($($ty:ty),*) => {$(
        impl<P: Port + ?Sized> Port for $ty {
            fn name(&self) -> &str { (**self).name() }
            fn config(&self) -> SerialConfig { (**self).config() }
            fn is_open(&self) -> bool { (**self).is_open() }
            fn read(&self, buffer: &mut [u8]) -> PortResult<usize> { (**self).read(buffer) }
            fn write(&self, data: &[u8]) -> PortResult<usize> { (**self).write(data) }
            fn close(&self) -> PortResult<()> { (**self).close() }
            fn rts(&self, enable: bool) -> PortResult<()> { (**self).rts(enable) }
            fn dtr(&self, enable: bool) -> PortResult<()> { (**self).dtr(enable) }
            fn cts(&self) -> PortResult<bool> { (**self).cts() }
            fn dsr(&self) -> PortResult<bool> { (**self).dsr() }
            fn ring(&self) -> PortResult<bool> { (**self).ring() }
            fn set_baud(&self, baud_rate: u32) -> PortResult<()> { (**self).set_baud(baud_rate) }
            fn signal_invert(&self, enable: bool) -> PortResult<()> {
                (**self).signal_invert(enable)
            }
            fn send_break(&self, enable: bool) -> PortResult<()> { (**self).send_break(enable) }
        }
    )*};
}

forward_port!(Arc<P>, Box<P>);
