//! Terminal-control block construction.
//!
//! [`termios_block`] is a pure function from a [`SerialConfig`] to the flag
//! words and control characters the kernel expects. [`apply`] writes such a
//! block to a descriptor.

use crate::port::error::{PortError, PortResult};
use crate::port::tables::{check_baud, check_stop_bits};
use crate::port::traits::{FlowControl, Parity, SerialConfig, StopBits};
use libc::{c_int, cc_t, speed_t, tcflag_t};
use std::mem::MaybeUninit;
use std::time::Duration;

/// Character size, receiver enable and "ignore modem status" for local lines.
const CFLAG_BASE: tcflag_t = libc::CS8 | libc::CREAD | libc::CLOCAL;

/// Longest inter-byte timer the driver can express, in tenths of a second.
const VTIME_MAX: u128 = 255;

/// Flag words and timing for one terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermiosBlock {
    pub iflag: tcflag_t,
    pub oflag: tcflag_t,
    pub cflag: tcflag_t,
    pub lflag: tcflag_t,
    pub vmin: cc_t,
    pub vtime: cc_t,
    pub speed: speed_t,
}

/// Native speed code for `baud_rate`.
#[cfg(target_os = "linux")]
pub fn speed_code(baud_rate: u32) -> PortResult<speed_t> {
    check_baud(baud_rate)?;
    let code = match baud_rate {
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        500000 => libc::B500000,
        576000 => libc::B576000,
        921600 => libc::B921600,
        1000000 => libc::B1000000,
        1152000 => libc::B1152000,
        1500000 => libc::B1500000,
        2000000 => libc::B2000000,
        2500000 => libc::B2500000,
        3000000 => libc::B3000000,
        3500000 => libc::B3500000,
        4000000 => libc::B4000000,
        other => {
            return Err(PortError::invalid_config(format!(
                "no speed code for {other}"
            )))
        }
    };
    Ok(code)
}

/// BSD-style terminals take the rate itself as the speed value.
#[cfg(not(target_os = "linux"))]
pub fn speed_code(baud_rate: u32) -> PortResult<speed_t> {
    check_baud(baud_rate)?;
    Ok(baud_rate as speed_t)
}

/// `(cflag, iflag)` bits for a parity mode.
pub fn parity_flags(parity: Parity) -> PortResult<(tcflag_t, tcflag_t)> {
    match parity {
        Parity::None => Ok((0, 0)),
        Parity::Odd => Ok((libc::PARENB | libc::PARODD, libc::INPCK)),
        Parity::Even => Ok((libc::PARENB, libc::INPCK)),
        #[cfg(target_os = "linux")]
        Parity::Mark => Ok((libc::PARENB | libc::PARODD | libc::CMSPAR, libc::INPCK)),
        #[cfg(target_os = "linux")]
        Parity::Space => Ok((libc::PARENB | libc::CMSPAR, libc::INPCK)),
        #[cfg(not(target_os = "linux"))]
        Parity::Mark | Parity::Space => Err(PortError::not_implemented(
            "mark/space parity needs CMSPAR",
        )),
    }
}

/// `(cflag, iflag)` bits for a flow control mode.
pub fn flow_flags(flow: FlowControl) -> (tcflag_t, tcflag_t) {
    match flow {
        FlowControl::None => (0, 0),
        FlowControl::Hardware => (libc::CRTSCTS, 0),
        FlowControl::Software => (0, libc::IXON | libc::IXOFF),
    }
}

/// `(VMIN, VTIME)` for a read timeout.
///
/// Zero blocks until one byte arrives. Anything else waits at most the
/// timeout, in 100 ms steps between 0.1 s and 25.5 s.
pub fn read_timing(timeout: Duration) -> (cc_t, cc_t) {
    if timeout.is_zero() {
        return (1, 0);
    }
    let tenths = (timeout.as_millis() / 100).clamp(1, VTIME_MAX);
    (0, tenths as cc_t)
}

/// Derive the complete block for `config`.
pub fn termios_block(config: &SerialConfig) -> PortResult<TermiosBlock> {
    let speed = speed_code(config.baud_rate)?;
    check_stop_bits(config.stop_bits)?;

    let (parity_c, parity_i) = parity_flags(config.parity)?;
    let (flow_c, flow_i) = flow_flags(config.flow_control);
    let stop_c = match config.stop_bits {
        StopBits::Two => libc::CSTOPB,
        _ => 0,
    };
    let (vmin, vtime) = read_timing(config.read_timeout);

    Ok(TermiosBlock {
        iflag: parity_i | flow_i,
        oflag: 0,
        cflag: CFLAG_BASE | parity_c | stop_c | flow_c,
        lflag: 0,
        vmin,
        vtime,
        speed,
    })
}

/// Fetch the current terminal attributes.
pub fn get(fd: c_int) -> PortResult<libc::termios> {
    let mut raw = MaybeUninit::<libc::termios>::uninit();
    // SAFETY: tcgetattr fully initialises the struct on success.
    if unsafe { libc::tcgetattr(fd, raw.as_mut_ptr()) } != 0 {
        return Err(PortError::last_os_error("tcgetattr"));
    }
    // SAFETY: the call above succeeded.
    Ok(unsafe { raw.assume_init() })
}

/// Replace the terminal attributes immediately.
pub fn set(fd: c_int, termios: &libc::termios) -> PortResult<()> {
    // SAFETY: `termios` is a valid, initialised struct borrowed for the call.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) } != 0 {
        return Err(PortError::last_os_error("tcsetattr"));
    }
    Ok(())
}

fn set_speed(termios: &mut libc::termios, speed: speed_t) -> PortResult<()> {
    // SAFETY: `termios` is exclusively borrowed and initialised.
    if unsafe { libc::cfsetispeed(termios, speed) } != 0 {
        return Err(PortError::last_os_error("cfsetispeed"));
    }
    // SAFETY: as above.
    if unsafe { libc::cfsetospeed(termios, speed) } != 0 {
        return Err(PortError::last_os_error("cfsetospeed"));
    }
    Ok(())
}

/// Write `block` to the terminal behind `fd`.
pub fn apply(fd: c_int, block: &TermiosBlock) -> PortResult<()> {
    let mut termios = get(fd)?;
    termios.c_iflag = block.iflag;
    termios.c_oflag = block.oflag;
    termios.c_cflag = block.cflag;
    termios.c_lflag = block.lflag;
    termios.c_cc[libc::VMIN] = block.vmin;
    termios.c_cc[libc::VTIME] = block.vtime;
    set_speed(&mut termios, block.speed)?;
    set(fd, &termios)
}

/// Change only the line speed of the terminal behind `fd`.
pub fn apply_speed(fd: c_int, speed: speed_t) -> PortResult<()> {
    let mut termios = get(fd)?;
    set_speed(&mut termios, speed)?;
    set(fd, &termios)
}
