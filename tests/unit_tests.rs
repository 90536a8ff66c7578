//! Unit tests for embserial's public surface
//!
//! Covers:
//! - Config validation shared by every backend
//! - The `Port` contract used through trait objects and smart pointers
//! - Error classification
//! - Configuration file to port configuration

use embserial::config::{Config, ConfigLoader};
use embserial::port::tables::BAUD_RATES;
use embserial::port::{
    ErrorKind, FlowControl, MockPort, Parity, Port, PortError, SerialConfig, StopBits,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Config validation
// ============================================================================

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unsupported_baud_rates_never_open() {
        for baud in [0, 76_800, 4_500_000] {
            let config = SerialConfig::new("/dev/nonexistent_port_12345").baud_rate(baud);
            let err = embserial::open(&config).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig, "baud {baud}");
        }
    }

    #[test]
    fn test_one_and_a_half_stop_bits_always_rejected() {
        for parity in [Parity::None, Parity::Odd, Parity::Even] {
            for flow in [FlowControl::None, FlowControl::Hardware, FlowControl::Software] {
                let config = SerialConfig::new("MOCK0")
                    .parity(parity)
                    .flow_control(flow)
                    .stop_bits(StopBits::OnePointFive);
                assert!(matches!(
                    MockPort::open(&config),
                    Err(PortError::InvalidConfig(_))
                ));
            }
        }
    }

    #[test]
    fn test_every_table_rate_accepted() {
        for &baud in BAUD_RATES {
            assert!(MockPort::open(&SerialConfig::new("MOCK0").baud_rate(baud)).is_ok());
        }
    }

    #[test]
    fn test_raw_codes() {
        assert_eq!(Parity::try_from(3).unwrap(), Parity::Mark);
        assert_eq!(StopBits::try_from(2).unwrap(), StopBits::Two);
        assert_eq!(FlowControl::try_from(1).unwrap(), FlowControl::Hardware);
        assert!(Parity::try_from(9).is_err());
    }
}

// ============================================================================
// Port contract
// ============================================================================

mod contract_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn echo(port: &dyn Port, message: &[u8]) -> Vec<u8> {
        port.write(message).unwrap();
        let mut buffer = vec![0u8; message.len()];
        let n = port.read(&mut buffer).unwrap();
        buffer.truncate(n);
        buffer
    }

    #[test]
    fn test_trait_object_usage() {
        let port: Box<dyn Port> = Box::new(MockPort::loopback("MOCK0"));
        assert_eq!(echo(port.as_ref(), b"Hari Aum"), b"Hari Aum");
        port.close().unwrap();
        assert!(!port.is_open());
    }

    #[test]
    fn test_arc_forwards_every_operation() {
        let mock = MockPort::loopback("MOCK0");
        let port = Arc::new(mock.clone());

        port.rts(true).unwrap();
        port.dtr(true).unwrap();
        assert!(port.cts().unwrap());
        assert!(port.dsr().unwrap());
        assert!(!port.ring().unwrap());

        port.set_baud(57_600).unwrap();
        port.send_break(true).unwrap();
        assert!(mock.break_active());
        assert_eq!(port.config().baud_rate, 57_600);
        assert_eq!(port.name(), "MOCK0");
    }

    #[test]
    fn test_invert_complements_reads() {
        let port = MockPort::new("MOCK0");
        port.set_cts(true);
        port.set_dsr(false);
        port.set_ring(true);
        let plain = (port.cts().unwrap(), port.dsr().unwrap(), port.ring().unwrap());

        port.signal_invert(true).unwrap();
        let inverted = (port.cts().unwrap(), port.dsr().unwrap(), port.ring().unwrap());
        assert_eq!(inverted, (!plain.0, !plain.1, !plain.2));
    }

    #[test]
    fn test_closed_port_is_inert() {
        let port = MockPort::new("MOCK0");
        port.close().unwrap();
        let err = port.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotOpen);
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    #[test]
    fn test_native_error_kind_survives() {
        let err = PortError::io("open", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::Io(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("open failed"));
    }

    #[test]
    fn test_half_duplex_wrappers_classify() {
        let setup = PortError::SignalSetup(Box::new(PortError::NotOpen));
        assert_eq!(setup.kind(), ErrorKind::NotInitialized);

        let signal = PortError::Signal {
            action: "release",
            source: Box::new(PortError::AccessDenied("/dev/gpiochip0".into())),
        };
        assert_eq!(signal.kind(), ErrorKind::AccessDenied);
        assert_eq!(PortError::EmptyBuffer.kind(), ErrorKind::InvalidInput);
    }
}

// ============================================================================
// Configuration file
// ============================================================================

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_to_port_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embserial.toml");
        std::fs::write(
            &path,
            r#"
                [serial]
                default_baud = 19200
                parity = "even"
                read_timeout_ms = 500

                [serial.port_aliases]
                bus = "/dev/ttyUSB3"

                [rs485]
                delay_before_us = 100
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::load_from(&path).unwrap();
        let config: &Config = loader.config();
        let port = config.serial.port_config("bus");

        assert_eq!(port.name, "/dev/ttyUSB3");
        assert_eq!(port.baud_rate, 19200);
        assert_eq!(port.parity, Parity::Even);
        assert_eq!(port.read_timeout, Duration::from_millis(500));
        assert_eq!(config.rs485.delay_before(), Duration::from_micros(100));
    }

    #[test]
    fn test_file_with_bad_baud_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embserial.toml");
        std::fs::write(&path, "[serial]\ndefault_baud = 12345\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("serial.default_baud"));
    }
}
