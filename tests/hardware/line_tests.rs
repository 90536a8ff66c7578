//! Modem control lines through RTS-CTS and DTR-DSR jumpers.

use super::utils::PortTestFixture;
use crate::{skip_without_hardware, skip_without_loopback};
use embserial::port::Port;
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(20);

#[test]
#[ignore]
fn test_rts_drives_cts() {
    skip_without_loopback!();
    let fixture = PortTestFixture::setup().unwrap();

    for level in [true, false, true] {
        fixture.port.rts(level).unwrap();
        thread::sleep(SETTLE);
        assert_eq!(fixture.port.cts().unwrap(), level);
    }
}

#[test]
#[ignore]
fn test_dtr_drives_dsr() {
    skip_without_loopback!();
    let fixture = PortTestFixture::setup().unwrap();

    for level in [true, false] {
        fixture.port.dtr(level).unwrap();
        thread::sleep(SETTLE);
        assert_eq!(fixture.port.dsr().unwrap(), level);
    }
}

#[test]
#[ignore]
fn test_invert_complements_inputs() {
    skip_without_hardware!();
    let fixture = PortTestFixture::setup().unwrap();
    let port = &fixture.port;

    let plain = (port.cts().unwrap(), port.dsr().unwrap(), port.ring().unwrap());
    port.signal_invert(true).unwrap();
    let inverted = (port.cts().unwrap(), port.dsr().unwrap(), port.ring().unwrap());
    port.signal_invert(false).unwrap();

    assert_eq!(inverted, (!plain.0, !plain.1, !plain.2));
}

#[test]
#[ignore]
fn test_invert_is_symmetric_on_loopback() {
    skip_without_loopback!();
    let fixture = PortTestFixture::setup_with(|c| c.signal_invert(true)).unwrap();

    // Inverted output through an inverted input reads back unchanged.
    fixture.port.rts(true).unwrap();
    thread::sleep(SETTLE);
    assert!(fixture.port.cts().unwrap());
}

#[test]
#[ignore]
fn test_break_toggles() {
    skip_without_hardware!();
    let fixture = PortTestFixture::setup().unwrap();
    fixture.port.send_break(true).unwrap();
    thread::sleep(Duration::from_millis(50));
    fixture.port.send_break(false).unwrap();
}
