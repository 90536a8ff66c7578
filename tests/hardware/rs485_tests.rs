//! Half-duplex controller on a real port with RTS jumpered to CTS.

use super::utils::{read_exact, testing};
use crate::skip_without_loopback;
use embserial::port::{self, Port};
use embserial::rs485::HalfDuplex;
use std::sync::Arc;
use std::time::Duration;

#[test]
#[ignore]
fn test_rts_asserted_during_write() {
    skip_without_loopback!();
    let Some(config) = testing().and_then(|t| t.port_config()) else {
        return;
    };
    let port = Arc::new(port::open(&config).unwrap());

    // The signal function probes CTS (wired to RTS) right after driving RTS.
    let probe = Arc::clone(&port);
    let mut seen = Vec::new();
    let (tx, rx) = std::sync::mpsc::channel();
    let mut bus = HalfDuplex::new(
        Arc::clone(&port),
        Duration::from_millis(1),
        Duration::from_millis(5),
        move |on| {
            probe.rts(on)?;
            std::thread::sleep(Duration::from_millis(2));
            let _ = tx.send((on, probe.cts()?));
            Ok(())
        },
    )
    .unwrap();

    bus.write(b"Hari Aum").unwrap();
    seen.extend(rx.try_iter());
    assert_eq!(seen, vec![(false, false), (true, true), (false, false)]);

    assert_eq!(read_exact(&port, 8, config.read_timeout), b"Hari Aum");
    bus.close().unwrap();
}

#[test]
#[ignore]
fn test_rts_released_after_write() {
    skip_without_loopback!();
    let Some(config) = testing().and_then(|t| t.port_config()) else {
        return;
    };
    let port = Arc::new(port::open(&config).unwrap());
    let mut bus =
        HalfDuplex::with_rts(Arc::clone(&port), Duration::ZERO, Duration::from_millis(2)).unwrap();

    for _ in 0..5 {
        bus.write(b"frame").unwrap();
        assert!(!port.cts().unwrap());
        read_exact(&port, 5, config.read_timeout);
    }
}
