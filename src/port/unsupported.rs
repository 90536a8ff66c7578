//! Placeholder backend for targets with neither termios nor Win32.

use super::error::{PortError, PortResult};
use super::traits::{Port, SerialConfig};

/// A port that can never be constructed.
#[derive(Debug)]
pub enum UnsupportedPort {}

impl UnsupportedPort {
    pub fn open(_config: &SerialConfig) -> PortResult<Self> {
        Err(PortError::not_implemented(
            "no serial backend for this target",
        ))
    }
}

impl Port for UnsupportedPort {
    fn name(&self) -> &str {
        match *self {}
    }

    fn config(&self) -> SerialConfig {
        match *self {}
    }

    fn is_open(&self) -> bool {
        match *self {}
    }

    fn read(&self, _buffer: &mut [u8]) -> PortResult<usize> {
        match *self {}
    }

    fn write(&self, _data: &[u8]) -> PortResult<usize> {
        match *self {}
    }

    fn close(&self) -> PortResult<()> {
        match *self {}
    }

    fn rts(&self, _enable: bool) -> PortResult<()> {
        match *self {}
    }

    fn dtr(&self, _enable: bool) -> PortResult<()> {
        match *self {}
    }

    fn cts(&self) -> PortResult<bool> {
        match *self {}
    }

    fn dsr(&self) -> PortResult<bool> {
        match *self {}
    }

    fn ring(&self) -> PortResult<bool> {
        match *self {}
    }

    fn set_baud(&self, _baud_rate: u32) -> PortResult<()> {
        match *self {}
    }

    fn signal_invert(&self, _enable: bool) -> PortResult<()> {
        match *self {}
    }

    fn send_break(&self, _enable: bool) -> PortResult<()> {
        match *self {}
    }
}
