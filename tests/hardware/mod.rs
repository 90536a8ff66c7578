//! Hardware-specific tests requiring real serial devices.
//!
//! Ignored by default; run manually with `--ignored` and:
//!
//! ```bash
//! export TEST_PORT=COM3          # or /dev/ttyUSB0
//! export TEST_BAUD=115200        # optional, default: 115200
//! export TEST_LOOPBACK=1         # TX-RX, RTS-CTS and DTR-DSR jumpered
//! ```

pub mod line_tests;
pub mod loopback_tests;
pub mod rs485_tests;
pub mod utils;
