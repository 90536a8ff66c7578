//! Port abstraction layer for serial communication.
//!
//! [`Port`] is the contract every backend implements. The backend for the
//! build target is available as [`NativePort`] and opened with [`open`];
//! [`MockPort`] implements the same contract in memory for tests.

pub mod error;
pub mod mock;
pub mod tables;
pub mod traits;

#[cfg(unix)]
pub mod posix;

// The DCB/timeout builders are pure and unit-tested on every host.
#[cfg(any(windows, test))]
pub mod overlapped;

#[cfg(not(any(unix, windows)))]
pub mod unsupported;

pub use error::{ErrorKind, PortError, PortResult};
pub use mock::{Event, EventKind, MockPort, WriteRecord};
pub use traits::*;

#[cfg(unix)]
pub use posix::TtyPort;

#[cfg(windows)]
pub use overlapped::ComPort;

/// The serial backend selected for the build target.
#[cfg(unix)]
pub type NativePort = TtyPort;

/// The serial backend selected for the build target.
#[cfg(windows)]
pub type NativePort = ComPort;

/// The serial backend selected for the build target.
#[cfg(not(any(unix, windows)))]
pub type NativePort = unsupported::UnsupportedPort;

/// Open `config` with the backend for this target.
pub fn open(config: &SerialConfig) -> PortResult<NativePort> {
    NativePort::open(config)
}
