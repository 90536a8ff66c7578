//! Device-control block, timeout and escape-code construction.
//!
//! Pure integer routines; the Windows glue copies the results into the
//! native `DCB` / `COMMTIMEOUTS` structs. Kept free of `winapi` so the bit
//! layout is tested on every platform.

use crate::port::error::PortResult;
use crate::port::tables::{check_baud, check_stop_bits, DATA_BITS};
use crate::port::traits::{FlowControl, Parity, SerialConfig, StopBits};
use std::time::Duration;

// DCB.BitFields layout, least significant bit first.
pub const F_BINARY: u32 = 1 << 0;
pub const F_PARITY: u32 = 1 << 1;
pub const F_OUTX_CTS_FLOW: u32 = 1 << 2;
pub const F_OUTX_DSR_FLOW: u32 = 1 << 3;
pub const F_DTR_CONTROL_SHIFT: u32 = 4;
pub const F_DSR_SENSITIVITY: u32 = 1 << 6;
pub const F_TX_CONTINUE_ON_XOFF: u32 = 1 << 7;
pub const F_OUTX: u32 = 1 << 8;
pub const F_INX: u32 = 1 << 9;
pub const F_ERROR_CHAR: u32 = 1 << 10;
pub const F_NULL: u32 = 1 << 11;
pub const F_RTS_CONTROL_SHIFT: u32 = 12;
pub const F_ABORT_ON_ERROR: u32 = 1 << 14;

pub const DTR_CONTROL_ENABLE: u32 = 0x01;
pub const RTS_CONTROL_ENABLE: u32 = 0x01;
pub const RTS_CONTROL_HANDSHAKE: u32 = 0x02;

// DCB.Parity
pub const NOPARITY: u8 = 0;
pub const ODDPARITY: u8 = 1;
pub const EVENPARITY: u8 = 2;
pub const MARKPARITY: u8 = 3;
pub const SPACEPARITY: u8 = 4;

// DCB.StopBits
pub const ONESTOPBIT: u8 = 0;
pub const ONE5STOPBITS: u8 = 1;
pub const TWOSTOPBITS: u8 = 2;

// EscapeCommFunction codes
pub const SETRTS: u32 = 3;
pub const CLRRTS: u32 = 4;
pub const SETDTR: u32 = 5;
pub const CLRDTR: u32 = 6;
pub const SETBREAK: u32 = 8;
pub const CLRBREAK: u32 = 9;

// GetCommModemStatus bits
pub const MS_CTS_ON: u32 = 0x0010;
pub const MS_DSR_ON: u32 = 0x0020;
pub const MS_RING_ON: u32 = 0x0040;

/// Driver receive / transmit queue sizes requested with `SetupComm`.
pub const RX_QUEUE_SIZE: u32 = 4096;
pub const TX_QUEUE_SIZE: u32 = 4096;

pub const XON_CHAR: u8 = 0x11;
pub const XOFF_CHAR: u8 = 0x13;

const MAXDWORD: u32 = u32::MAX;

/// Values for the fields of a `DCB` that this driver sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommState {
    pub baud_rate: u32,
    pub bit_fields: u32,
    pub xon_lim: u16,
    pub xoff_lim: u16,
    pub byte_size: u8,
    pub parity: u8,
    pub stop_bits: u8,
    pub xon_char: u8,
    pub xoff_char: u8,
}

impl CommState {
    /// Derive the block for `config`.
    ///
    /// RTS and DTR are both enabled; hardware flow control switches RTS to
    /// handshake mode and makes output wait on CTS.
    pub fn from_config(config: &SerialConfig) -> PortResult<Self> {
        check_baud(config.baud_rate)?;
        check_stop_bits(config.stop_bits)?;

        Ok(Self {
            baud_rate: config.baud_rate,
            bit_fields: bit_fields(config.parity, config.flow_control),
            xon_lim: (RX_QUEUE_SIZE / 4) as u16,
            xoff_lim: (RX_QUEUE_SIZE / 4) as u16,
            byte_size: DATA_BITS,
            parity: parity_code(config.parity),
            stop_bits: stop_bits_code(config.stop_bits),
            xon_char: XON_CHAR,
            xoff_char: XOFF_CHAR,
        })
    }
}

/// Packed `DCB.BitFields` word.
pub fn bit_fields(parity: Parity, flow: FlowControl) -> u32 {
    let mut bits = F_BINARY | (DTR_CONTROL_ENABLE << F_DTR_CONTROL_SHIFT);

    if parity != Parity::None {
        bits |= F_PARITY;
    }

    match flow {
        FlowControl::None => bits |= RTS_CONTROL_ENABLE << F_RTS_CONTROL_SHIFT,
        FlowControl::Hardware => {
            bits |= F_OUTX_CTS_FLOW | (RTS_CONTROL_HANDSHAKE << F_RTS_CONTROL_SHIFT)
        }
        FlowControl::Software => {
            bits |= F_OUTX | F_INX | (RTS_CONTROL_ENABLE << F_RTS_CONTROL_SHIFT)
        }
    }

    bits
}

pub fn parity_code(parity: Parity) -> u8 {
    match parity {
        Parity::None => NOPARITY,
        Parity::Odd => ODDPARITY,
        Parity::Even => EVENPARITY,
        Parity::Mark => MARKPARITY,
        Parity::Space => SPACEPARITY,
    }
}

pub fn stop_bits_code(stop_bits: StopBits) -> u8 {
    match stop_bits {
        StopBits::One => ONESTOPBIT,
        StopBits::OnePointFive => ONE5STOPBITS,
        StopBits::Two => TWOSTOPBITS,
    }
}

/// Fields of `COMMTIMEOUTS`, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read_interval: u32,
    pub read_total_multiplier: u32,
    pub read_total_constant: u32,
    pub write_total_multiplier: u32,
    pub write_total_constant: u32,
}

/// "Wait for a byte, then return with whatever has arrived."
///
/// With the interval and multiplier at `MAXDWORD`, the constant bounds the
/// wait for the first byte: effectively forever for a zero timeout, the
/// timeout in milliseconds otherwise.
pub fn timeouts(read_timeout: Duration) -> Timeouts {
    let read_total_constant = if read_timeout.is_zero() {
        MAXDWORD - 1
    } else {
        read_timeout.as_millis().clamp(1, (MAXDWORD - 1) as u128) as u32
    };
    Timeouts {
        read_interval: MAXDWORD,
        read_total_multiplier: MAXDWORD,
        read_total_constant,
        write_total_multiplier: 0,
        write_total_constant: 0,
    }
}

/// Modem output lines driven with `EscapeCommFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    Rts,
    Dtr,
}

/// Escape code that drives `line` to the requested logical level.
pub fn line_escape(line: OutputLine, enable: bool, invert: bool) -> u32 {
    let set = enable ^ invert;
    match (line, set) {
        (OutputLine::Rts, true) => SETRTS,
        (OutputLine::Rts, false) => CLRRTS,
        (OutputLine::Dtr, true) => SETDTR,
        (OutputLine::Dtr, false) => CLRDTR,
    }
}

pub fn break_escape(enable: bool) -> u32 {
    if enable {
        SETBREAK
    } else {
        CLRBREAK
    }
}

/// Logical level of an input line given the modem status word.
pub fn line_active(status: u32, mask: u32, invert: bool) -> bool {
    (status & mask != 0) ^ invert
}

/// Prefix bare names such as `COM12` with `\\.\`.
pub fn device_path(name: &str) -> String {
    if name.starts_with('\\') {
        name.to_string()
    } else {
        format!(r"\\.\{name}")
    }
}
