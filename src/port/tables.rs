//! Validation shared by every backend.
//!
//! Backends translate a [`SerialConfig`] into their own native block, but the
//! set of accepted values is the same everywhere and lives here.

use super::error::{PortError, PortResult};
use super::traits::{SerialConfig, StopBits};

/// Baud rates accepted by [`validate`], in ascending order.
pub const BAUD_RATES: &[u32] = &[
    300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 500000,
    576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000, 3000000, 3500000, 4000000,
];

/// Data size is always eight bits.
pub const DATA_BITS: u8 = 8;

/// Check that `baud_rate` is one of [`BAUD_RATES`].
pub fn check_baud(baud_rate: u32) -> PortResult<()> {
    if baud_rate == 0 {
        return Err(PortError::invalid_config("baud rate must be positive"));
    }
    if BAUD_RATES.binary_search(&baud_rate).is_err() {
        return Err(PortError::invalid_config(format!(
            "unsupported baud rate {baud_rate}"
        )));
    }
    Ok(())
}

/// Check stop bits; one and a half is recognised but refused.
pub fn check_stop_bits(stop_bits: StopBits) -> PortResult<()> {
    match stop_bits {
        StopBits::One | StopBits::Two => Ok(()),
        StopBits::OnePointFive => Err(PortError::invalid_config(
            "1.5 stop bits are not supported by this controller",
        )),
    }
}

/// Validate the parts of `config` every backend agrees on.
pub fn validate(config: &SerialConfig) -> PortResult<()> {
    if config.name.is_empty() {
        return Err(PortError::invalid_config("device name is empty"));
    }
    check_baud(config.baud_rate)?;
    check_stop_bits(config.stop_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_is_sorted_and_bounded() {
        assert!(BAUD_RATES.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(BAUD_RATES.first(), Some(&300));
        assert_eq!(BAUD_RATES.last(), Some(&4_000_000));
    }

    #[test]
    fn test_rejected_rates() {
        for rate in [0, 76_800, 4_500_000, 110] {
            assert!(
                matches!(check_baud(rate), Err(PortError::InvalidConfig(_))),
                "{rate} should be rejected"
            );
        }
    }

    #[test]
    fn test_one_and_a_half_stop_bits_rejected() {
        let config = SerialConfig::new("/dev/null").stop_bits(StopBits::OnePointFive);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("1.5 stop bits"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(validate(&SerialConfig::default()).is_err());
    }

    proptest! {
        #[test]
        fn prop_only_table_rates_pass(rate in any::<u32>()) {
            prop_assert_eq!(check_baud(rate).is_ok(), BAUD_RATES.contains(&rate));
        }
    }
}
