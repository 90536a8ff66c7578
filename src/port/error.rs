//! Port-specific error types.
//!
//! Every backend and the half-duplex controller report failures through
//! [`PortError`]. Native OS failures are carried unchanged inside
//! [`PortError::Io`] together with the name of the call that failed.

use std::io;
use thiserror::Error;

/// Coarse classification of a [`PortError`], in the spirit of
/// [`std::io::ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A handle or controller was used before it was set up.
    NotInitialized,
    /// The port was closed or never opened.
    NotOpen,
    /// The device is already held by this process.
    AlreadyOpen,
    /// The device is held by someone else or permissions are missing.
    AccessDenied,
    /// The requested configuration is recognised but unsupported here.
    NotImplemented,
    /// Baud, parity, stop bits or flow control outside the supported set.
    InvalidConfig,
    /// An empty buffer was handed to a read or write.
    InvalidInput,
    /// A native I/O failure, with the OS error kind.
    Io(io::ErrorKind),
}

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The port or controller was never initialised.
    #[error("Port is not initialized")]
    NotInitialized,

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// Attempted to open a port that's already open.
    #[error("Port is already open")]
    AlreadyOpen,

    /// The device is in use by another process or access was refused.
    #[error("Access denied to {0}")]
    AccessDenied(String),

    /// The requested feature is not available on this platform or controller.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Port configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Read or write called with a zero-length buffer.
    #[error("Buffer is empty")]
    EmptyBuffer,

    /// A native call failed.
    #[error("{context} failed: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// The enable line could not be driven to receive mode while setting up
    /// a half-duplex controller.
    #[error("Could not set up the signalling line: {0}")]
    SignalSetup(#[source] Box<PortError>),

    /// The enable line could not be driven during a turnaround.
    #[error("Failed to {action} the enable line: {source}")]
    Signal {
        action: &'static str,
        #[source]
        source: Box<PortError>,
    },

    /// Both the transmission and the release of the enable line failed.
    #[error("Write failed ({write}) and the enable line could not be released ({release})")]
    Turnaround {
        write: Box<PortError>,
        release: Box<PortError>,
    },
}

impl PortError {
    /// Create an InvalidConfig error from a message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a NotImplemented error from a message.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    /// Wrap a native error with the call that produced it.
    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Capture `errno` / `GetLastError` for the given call.
    pub fn last_os_error(context: &'static str) -> Self {
        Self::io(context, io::Error::last_os_error())
    }

    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized | Self::SignalSetup(_) => ErrorKind::NotInitialized,
            Self::NotOpen => ErrorKind::NotOpen,
            Self::AlreadyOpen => ErrorKind::AlreadyOpen,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::EmptyBuffer => ErrorKind::InvalidInput,
            Self::Io { source, .. } => ErrorKind::Io(source.kind()),
            Self::Signal { source, .. } => source.kind(),
            Self::Turnaround { write, .. } => write.kind(),
        }
    }
}

/// Result type for port operations.
pub type PortResult<T> = Result<T, PortError>;
