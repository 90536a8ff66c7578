//! embserial library
//!
//! Exclusive-access serial ports for POSIX terminals and Windows COM devices
//! behind one [`Port`] contract, plus half-duplex (RS485) direction control
//! on top of any port.
//!
//! # Modules
//!
//! - `port`: the [`Port`] contract, the native backends and a mock
//! - `rs485`: [`HalfDuplex`] driver-enable turnaround
//! - `config`: TOML configuration with environment overrides
//!
//! # Example
//!
//! ```no_run
//! use embserial::{Port, SerialConfig};
//!
//! let port = embserial::open(&SerialConfig::new("/dev/ttyUSB0").baud_rate(115_200))?;
//! port.write(b"Hari Aum")?;
//!
//! let mut buffer = [0u8; 8];
//! let n = port.read(&mut buffer)?;
//! println!("{:?}", &buffer[..n]);
//! port.close()?;
//! # Ok::<(), embserial::PortError>(())
//! ```

pub mod config;
pub mod port;
pub mod rs485;

// Re-export commonly used types for convenience
pub use port::{
    open, ErrorKind, FlowControl, MockPort, NativePort, Parity, Port, PortError, PortResult,
    SerialConfig, StopBits,
};
pub use rs485::{EnableLine, HalfDuplex};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
