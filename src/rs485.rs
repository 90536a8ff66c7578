//! Half-duplex (RS485) direction control.
//!
//! An RS485 transceiver has a driver-enable input that must be raised before
//! the UART starts shifting bits out and dropped once the last stop bit has
//! left, so the far end can answer. [`HalfDuplex`] wraps a [`Port`] and
//! drives that input through a caller-supplied signal function around every
//! write.
//!
//! # Example
//! ```
//! use embserial::port::{MockPort, Port};
//! use embserial::rs485::HalfDuplex;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let port = Arc::new(MockPort::new("MOCK0"));
//! let mut bus = HalfDuplex::with_rts(port.clone(), Duration::ZERO, Duration::from_millis(1))?;
//! bus.write(b"Hari Aum")?;
//!
//! assert!(port.write_log()[0].rts);
//! assert!(!port.rts_level());
//! # Ok::<(), embserial::port::PortError>(())
//! ```

use crate::port::{Port, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

/// Drives the transceiver enable input. `true` enables the driver.
pub type SignalFn = Box<dyn FnMut(bool) -> PortResult<()> + Send>;

/// Modem output line wired to the transceiver's driver-enable input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnableLine {
    #[default]
    Rts,
    Dtr,
}

/// A port with half-duplex turnaround around every write.
pub struct HalfDuplex<P: Port> {
    port: P,
    delay_before: Duration,
    delay_after: Duration,
    signal: SignalFn,
}

impl<P: Port> HalfDuplex<P> {
    /// Wrap an open `port`.
    ///
    /// `signal(false)` is called straight away so the bus starts in receive
    /// mode; if that fails no controller is returned.
    pub fn new<F>(
        port: P,
        delay_before: Duration,
        delay_after: Duration,
        signal: F,
    ) -> PortResult<Self>
    where
        F: FnMut(bool) -> PortResult<()> + Send + 'static,
    {
        if !port.is_open() {
            return Err(PortError::NotInitialized);
        }

        let mut signal: SignalFn = Box::new(signal);
        signal(false).map_err(|e| PortError::SignalSetup(Box::new(e)))?;
        trace!("{}: half-duplex ready, receive mode", port.name());

        Ok(Self {
            port,
            delay_before,
            delay_after,
            signal,
        })
    }

    /// Transmit `data`, enabling the driver for the duration.
    ///
    /// The driver is released after `delay_after` even when the write
    /// fails. When both the write and the release fail the error carries
    /// both causes.
    pub fn write(&mut self, data: &[u8]) -> PortResult<usize> {
        if data.is_empty() {
            return Err(PortError::EmptyBuffer);
        }
        if !self.port.is_open() {
            return Err(PortError::NotOpen);
        }

        (self.signal)(true).map_err(|e| PortError::Signal {
            action: "assert",
            source: Box::new(e),
        })?;
        trace!("{}: driver enabled", self.port.name());
        pause(self.delay_before);

        let written = self.port.write(data);

        pause(self.delay_after);
        let released = (self.signal)(false);
        trace!("{}: driver released", self.port.name());

        match (written, released) {
            (Ok(n), Ok(())) => Ok(n),
            (Err(write), Ok(())) => Err(write),
            (Ok(_), Err(release)) => {
                warn!(
                    "{}: enable line stuck after write: {}",
                    self.port.name(),
                    release
                );
                Err(PortError::Signal {
                    action: "release",
                    source: Box::new(release),
                })
            }
            (Err(write), Err(release)) => {
                warn!(
                    "{}: enable line stuck after failed write: {}",
                    self.port.name(),
                    release
                );
                Err(PortError::Turnaround {
                    write: Box::new(write),
                    release: Box::new(release),
                })
            }
        }
    }

    /// Make sure the driver is off, then read.
    pub fn read(&mut self, buffer: &mut [u8]) -> PortResult<usize> {
        if buffer.is_empty() {
            return Err(PortError::EmptyBuffer);
        }
        if !self.port.is_open() {
            return Err(PortError::NotOpen);
        }

        (self.signal)(false).map_err(|e| PortError::Signal {
            action: "release",
            source: Box::new(e),
        })?;
        self.port.read(buffer)
    }

    pub fn close(&self) -> PortResult<()> {
        self.port.close()
    }

    pub fn delay_before(&self) -> Duration {
        self.delay_before
    }

    pub fn delay_after(&self) -> Duration {
        self.delay_after
    }

    pub fn get_ref(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Port + ?Sized + 'static> HalfDuplex<Arc<P>> {
    /// Controller that drives the port's own RTS line.
    pub fn with_rts(
        port: Arc<P>,
        delay_before: Duration,
        delay_after: Duration,
    ) -> PortResult<Self> {
        Self::with_line(port, EnableLine::Rts, delay_before, delay_after)
    }

    /// Controller that drives one of the port's own output lines.
    pub fn with_line(
        port: Arc<P>,
        line: EnableLine,
        delay_before: Duration,
        delay_after: Duration,
    ) -> PortResult<Self> {
        let lines = Arc::clone(&port);
        let signal = move |enable: bool| match line {
            EnableLine::Rts => lines.rts(enable),
            EnableLine::Dtr => lines.dtr(enable),
        };
        Self::new(port, delay_before, delay_after, signal)
    }
}

impl<P: Port> fmt::Debug for HalfDuplex<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HalfDuplex")
            .field("port", &self.port)
            .field("delay_before", &self.delay_before)
            .field("delay_after", &self.delay_after)
            .finish_non_exhaustive()
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
