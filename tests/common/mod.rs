//! Shared test utilities for embserial tests.
//!
//! - Mock port creation with pre-programmed responses
//! - Event-journal helpers for timing assertions
//! - Linux pseudo-terminal pairs standing in for a wired serial line

#![allow(dead_code)]

use embserial::port::{Event, EventKind, MockPort};
use std::time::Duration;

/// Create a mock serial port with pre-programmed responses.
///
/// # Example
/// ```ignore
/// let mock = mock_with_responses("MOCK0", &[b"OK\r\n", b"READY\r\n"]);
/// ```
pub fn mock_with_responses(port_name: &str, responses: &[&[u8]]) -> MockPort {
    let mock = MockPort::new(port_name);
    for response in responses {
        mock.enqueue_read(response);
    }
    mock
}

/// Position of the first event matching `kind`.
pub fn position_of(events: &[Event], kind: &EventKind) -> Option<usize> {
    events.iter().position(|e| &e.kind == kind)
}

/// Time between the first events matching `from` and `to`.
pub fn gap_between(events: &[Event], from: &EventKind, to: &EventKind) -> Duration {
    let start = position_of(events, from)
        .unwrap_or_else(|| panic!("no {:?} event in {:?}", from, events));
    let end = position_of(events, to)
        .unwrap_or_else(|| panic!("no {:?} event in {:?}", to, events));
    assert!(start <= end, "{:?} happened after {:?}", from, to);
    events[end].at.duration_since(events[start].at)
}

#[cfg(target_os = "linux")]
pub mod pty {
    use std::ffi::CStr;
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    /// Master side of a pseudo-terminal plus the path of its slave device.
    pub struct Pty {
        pub master: OwnedFd,
        pub slave_path: String,
    }

    impl Pty {
        pub fn open() -> Self {
            unsafe {
                let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
                assert!(master >= 0, "posix_openpt: {}", io::Error::last_os_error());
                let master = OwnedFd::from_raw_fd(master);
                assert_eq!(libc::grantpt(master.as_raw_fd()), 0, "grantpt");
                assert_eq!(libc::unlockpt(master.as_raw_fd()), 0, "unlockpt");

                let mut name = [0 as libc::c_char; 128];
                assert_eq!(
                    libc::ptsname_r(master.as_raw_fd(), name.as_mut_ptr(), name.len()),
                    0,
                    "ptsname_r"
                );
                let slave_path = CStr::from_ptr(name.as_ptr())
                    .to_str()
                    .expect("pty path is UTF-8")
                    .to_string();

                Self { master, slave_path }
            }
        }

        /// Write to the master (arrives on the slave's RX).
        pub fn send(&self, data: &[u8]) {
            let n = unsafe {
                libc::write(self.master.as_raw_fd(), data.as_ptr().cast(), data.len())
            };
            assert_eq!(n, data.len() as isize, "master write");
        }

        /// Read exactly `len` bytes from the master (the slave's TX).
        pub fn receive(&self, len: usize) -> Vec<u8> {
            let mut out = Vec::with_capacity(len);
            let mut buffer = [0u8; 256];
            while out.len() < len {
                let want = (len - out.len()).min(buffer.len());
                let n = unsafe {
                    libc::read(self.master.as_raw_fd(), buffer.as_mut_ptr().cast(), want)
                };
                assert!(n > 0, "master read: {}", io::Error::last_os_error());
                out.extend_from_slice(&buffer[..n as usize]);
            }
            out
        }
    }
}
