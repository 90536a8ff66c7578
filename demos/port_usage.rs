//! Example demonstrating the `Port` contract and half-duplex turnaround.
//!
//! Runs against `MockPort`, so no hardware is needed. Pass a device name to
//! also open a real port: `cargo run --example port_usage -- /dev/ttyUSB0`.

use embserial::port::{EventKind, MockPort, Port, SerialConfig};
use embserial::rs485::HalfDuplex;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Port Example ===\n");

    println!("1. MockPort with loopback wiring:");
    mock_example()?;

    println!("\n2. RS485 turnaround on a mock bus:");
    rs485_example()?;

    if let Some(device) = std::env::args().nth(1) {
        println!("\n3. Real port {device}:");
        real_port_example(&device)?;
    }

    println!("\n=== Example complete ===");
    Ok(())
}

fn mock_example() -> Result<(), Box<dyn std::error::Error>> {
    let port = MockPort::loopback("MOCK0");

    let response = query(&port, b"Hari Aum")?;
    println!("  Echoed: {}", response);

    port.rts(true)?;
    println!("  RTS high -> CTS reads {}", port.cts()?);
    port.signal_invert(true)?;
    println!("  With inversion CTS reads {}", port.cts()?);
    Ok(())
}

fn rs485_example() -> Result<(), Box<dyn std::error::Error>> {
    let port = Arc::new(MockPort::new("BUS0"));
    let mut bus = HalfDuplex::with_rts(
        Arc::clone(&port),
        Duration::from_micros(200),
        Duration::from_millis(1),
    )?;
    bus.write(b"\x01\x03\x00\x00\x00\x01")?;

    for event in port.events() {
        match event.kind {
            EventKind::Rts(level) => println!("  RTS -> {}", level),
            EventKind::Write(data) => println!("  wrote {} bytes", data.len()),
            other => println!("  {:?}", other),
        }
    }
    Ok(())
}

fn real_port_example(device: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = SerialConfig::new(device)
        .baud_rate(115_200)
        .read_timeout(Duration::from_millis(500));
    let port = embserial::open(&config)?;
    println!(
        "  CTS={} DSR={} RING={}",
        port.cts()?,
        port.dsr()?,
        port.ring()?
    );
    port.close()?;
    Ok(())
}

/// Works with any port: write a request, return whatever comes back.
fn query(port: &dyn Port, request: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    port.write(request)?;

    let mut buffer = [0u8; 256];
    let n = port.read(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer[..n]).to_string())
}
