//! Byte round trips through a TX-RX jumper.

use super::utils::{read_exact, PortTestFixture};
use crate::{skip_without_hardware, skip_without_loopback};
use embserial::port::{self, FlowControl, Parity, Port, PortError, StopBits};
use std::time::Duration;

#[test]
#[ignore]
fn test_open_close() {
    skip_without_hardware!();
    let fixture = PortTestFixture::setup().unwrap();
    fixture.port.close().unwrap();
    assert!(matches!(fixture.port.close(), Err(PortError::NotOpen)));
}

#[test]
#[ignore]
fn test_second_open_refused() {
    skip_without_hardware!();
    let fixture = PortTestFixture::setup().unwrap();
    let config = fixture.port.config();

    let second = port::open(&config);
    assert!(
        matches!(second, Err(PortError::AlreadyOpen) | Err(PortError::AccessDenied(_))),
        "got {:?}",
        second
    );
    assert!(fixture.port.is_open());
}

#[test]
#[ignore]
fn test_hari_aum_round_trip() {
    skip_without_loopback!();
    let fixture = PortTestFixture::setup_with(|c| c.baud_rate(115_200)).unwrap();

    assert_eq!(fixture.port.write(b"Hari Aum").unwrap(), 8);
    assert_eq!(fixture.read_exact(8), b"Hari Aum");
}

#[test]
#[ignore]
fn test_every_framing_combination() {
    skip_without_loopback!();
    let parities = [Parity::None, Parity::Odd, Parity::Even];
    let stops = [StopBits::One, StopBits::Two];
    let flows = [FlowControl::None, FlowControl::Hardware];

    for parity in parities {
        for stop_bits in stops {
            for flow in flows {
                let fixture = PortTestFixture::setup_with(|c| {
                    c.parity(parity).stop_bits(stop_bits).flow_control(flow)
                })
                .unwrap();
                let message = format!("{parity:?}/{stop_bits:?}/{flow:?}");
                fixture.port.write(message.as_bytes()).unwrap();
                assert_eq!(
                    fixture.read_exact(message.len()),
                    message.as_bytes(),
                    "{message}"
                );
            }
        }
    }
}

#[test]
#[ignore]
fn test_baud_switching() {
    skip_without_loopback!();
    let fixture = PortTestFixture::setup().unwrap();

    for baud in [9600, 19200, 57600, 115200] {
        fixture.port.set_baud(baud).unwrap();
        fixture.port.write(b"baud").unwrap();
        assert_eq!(fixture.read_exact(4), b"baud", "at {baud}");
    }
}

#[test]
#[ignore]
fn test_read_timeout_without_data() {
    skip_without_hardware!();
    let fixture =
        PortTestFixture::setup_with(|c| c.read_timeout(Duration::from_millis(200))).unwrap();

    let mut buffer = [0u8; 8];
    let n = fixture.port.read(&mut buffer).unwrap();
    assert_eq!(n, 0);
    // Nothing buffered afterwards either.
    assert!(read_exact(&fixture.port, 1, Duration::from_millis(300)).is_empty());
}
