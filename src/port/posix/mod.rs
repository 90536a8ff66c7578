//! POSIX terminal backend.
//!
//! A [`TtyPort`] owns one descriptor on a terminal device. Every operation
//! that touches the descriptor takes the port's single lock for the duration
//! of that one native call, so two logical steps (raise RTS, later drop it)
//! are two separately locked operations.

mod holders;
pub mod termios;

pub use holders::{holders_of, Holders};

use crate::port::error::{PortError, PortResult};
use crate::port::tables;
use crate::port::traits::{Port, SerialConfig};
use libc::c_int;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct State {
    fd: Option<OwnedFd>,
    config: SerialConfig,
}

impl State {
    fn raw_fd(&self) -> PortResult<RawFd> {
        self.fd
            .as_ref()
            .map(|fd| fd.as_raw_fd())
            .ok_or(PortError::NotOpen)
    }
}

/// Serial port on a POSIX terminal device.
#[derive(Debug)]
pub struct TtyPort {
    name: String,
    state: Mutex<State>,
}

impl TtyPort {
    /// Open and configure the device named in `config`.
    ///
    /// # Example
    /// ```no_run
    /// use embserial::port::{Port, SerialConfig, TtyPort};
    ///
    /// let port = TtyPort::open(&SerialConfig::new("/dev/ttyUSB0").baud_rate(115_200))?;
    /// port.write(b"Hari Aum")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &SerialConfig) -> PortResult<Self> {
        let config = config.clone();
        tables::validate(&config)?;
        let block = termios::termios_block(&config)?;

        let fd = open_device(&config.name)?;
        // Dropping `fd` on failure closes it.
        termios::apply(fd.as_raw_fd(), &block)?;

        debug!(
            "Opened {} at {} baud ({:?}, {:?}, {:?})",
            config.name, config.baud_rate, config.parity, config.stop_bits, config.flow_control
        );

        Ok(Self {
            name: config.name.clone(),
            state: Mutex::new(State {
                fd: Some(fd),
                config,
            }),
        })
    }

    /// Close this port's own descriptor and open the device again with the
    /// stored configuration.
    pub fn reopen(&self) -> PortResult<()> {
        let mut state = self.state.lock();
        let old = state.fd.take().ok_or(PortError::NotOpen)?;
        if let Err(e) = release(old) {
            warn!("Releasing {} before reopen: {}", self.name, e);
        }

        let block = termios::termios_block(&state.config)?;
        let fd = open_device(&state.config.name)?;
        termios::apply(fd.as_raw_fd(), &block)?;
        state.fd = Some(fd);

        debug!("Reopened {}", self.name);
        Ok(())
    }

    /// Current terminal attributes.
    pub fn termios(&self) -> PortResult<libc::termios> {
        let state = self.state.lock();
        termios::get(state.raw_fd()?)
    }

    /// Replace the terminal attributes wholesale.
    pub fn set_termios(&self, attrs: &libc::termios) -> PortResult<()> {
        let state = self.state.lock();
        termios::set(state.raw_fd()?, attrs)
    }

    /// Raw `TIOCM_*` modem bits, without inversion.
    pub fn modem_bits(&self) -> PortResult<c_int> {
        let state = self.state.lock();
        get_modem_bits(state.raw_fd()?)
    }

    /// Replace the raw `TIOCM_*` modem bits, without inversion.
    pub fn set_modem_bits(&self, bits: c_int) -> PortResult<()> {
        let state = self.state.lock();
        set_modem_bits(state.raw_fd()?, bits)
    }

    fn drive_line(&self, mask: c_int, enable: bool, line: &'static str) -> PortResult<()> {
        let state = self.state.lock();
        let fd = state.raw_fd()?;
        let bits = get_modem_bits(fd)?;
        set_modem_bits(fd, with_line(bits, mask, enable, state.config.signal_invert))?;
        trace!("{} {} -> {}", self.name, line, enable);
        Ok(())
    }

    fn sense_line(&self, mask: c_int) -> PortResult<bool> {
        let state = self.state.lock();
        let bits = get_modem_bits(state.raw_fd()?)?;
        Ok(line_level(bits, mask, state.config.signal_invert))
    }
}

/// `bits` with the output line under `mask` driven to the requested level.
fn with_line(bits: c_int, mask: c_int, enable: bool, invert: bool) -> c_int {
    if enable ^ invert {
        bits | mask
    } else {
        bits & !mask
    }
}

/// Logical level of the input line under `mask`.
fn line_level(bits: c_int, mask: c_int, invert: bool) -> bool {
    (bits & mask != 0) ^ invert
}

impl Port for TtyPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> SerialConfig {
        self.state.lock().config.clone()
    }

    fn is_open(&self) -> bool {
        self.state.lock().fd.is_some()
    }

    fn read(&self, buffer: &mut [u8]) -> PortResult<usize> {
        let state = self.state.lock();
        let fd = state.raw_fd()?;
        loop {
            // SAFETY: `buffer` is valid for `buffer.len()` writable bytes and `fd`
            // stays open while the state lock is held.
            let n = unsafe { libc::read(fd, buffer.as_mut_ptr().cast(), buffer.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(PortError::io("read", err));
            }
        }
    }

    fn write(&self, data: &[u8]) -> PortResult<usize> {
        let state = self.state.lock();
        let fd = state.raw_fd()?;
        // SAFETY: `data` is valid for `data.len()` bytes; `fd` is held open by the lock.
        let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if n < 0 {
            return Err(PortError::last_os_error("write"));
        }
        Ok(n as usize)
    }

    fn close(&self) -> PortResult<()> {
        let fd = self.state.lock().fd.take().ok_or(PortError::NotOpen)?;
        release(fd)?;
        debug!("Closed {}", self.name);
        Ok(())
    }

    fn rts(&self, enable: bool) -> PortResult<()> {
        self.drive_line(libc::TIOCM_RTS as c_int, enable, "RTS")
    }

    fn dtr(&self, enable: bool) -> PortResult<()> {
        self.drive_line(libc::TIOCM_DTR as c_int, enable, "DTR")
    }

    fn cts(&self) -> PortResult<bool> {
        self.sense_line(libc::TIOCM_CTS as c_int)
    }

    fn dsr(&self) -> PortResult<bool> {
        self.sense_line(libc::TIOCM_DSR as c_int)
    }

    fn ring(&self) -> PortResult<bool> {
        self.sense_line(libc::TIOCM_RI as c_int)
    }

    fn set_baud(&self, baud_rate: u32) -> PortResult<()> {
        let mut state = self.state.lock();
        let fd = state.raw_fd()?;
        let speed = termios::speed_code(baud_rate)?;
        termios::apply_speed(fd, speed)?;
        state.config.baud_rate = baud_rate;
        debug!("{} baud -> {}", self.name, baud_rate);
        Ok(())
    }

    fn signal_invert(&self, enable: bool) -> PortResult<()> {
        let mut state = self.state.lock();
        state.raw_fd()?;
        state.config.signal_invert = enable;
        Ok(())
    }

    fn send_break(&self, enable: bool) -> PortResult<()> {
        let state = self.state.lock();
        let fd = state.raw_fd()?;
        let (request, context) = if enable {
            (libc::TIOCSBRK, "TIOCSBRK")
        } else {
            (libc::TIOCCBRK, "TIOCCBRK")
        };
        // SAFETY: break requests take no argument.
        if unsafe { libc::ioctl(fd, request as _) } != 0 {
            return Err(PortError::last_os_error(context));
        }
        Ok(())
    }
}

/// Open `name` exclusively and return a blocking descriptor.
fn open_device(name: &str) -> PortResult<OwnedFd> {
    let path = Path::new(name);
    let canonical = fs::canonicalize(path).map_err(|e| PortError::io("open", e))?;

    let holders = holders_of(&canonical);
    if !holders.others.is_empty() {
        return Err(PortError::AccessDenied(format!(
            "{name} (held by pid {:?})",
            holders.others
        )));
    }
    if holders.ours {
        return Err(PortError::AlreadyOpen);
    }

    // O_NONBLOCK keeps open() from waiting on carrier detect; cleared below.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| match e.raw_os_error() {
            Some(libc::EBUSY) => PortError::AlreadyOpen,
            Some(libc::EACCES) | Some(libc::EPERM) => PortError::AccessDenied(name.to_string()),
            _ => PortError::io("open", e),
        })?;
    let fd = OwnedFd::from(file);
    let raw = fd.as_raw_fd();

    // SAFETY: `raw` belongs to `fd`, which outlives every call below.
    if unsafe { libc::ioctl(raw, libc::TIOCEXCL as _) } != 0 {
        return Err(PortError::last_os_error("TIOCEXCL"));
    }
    // SAFETY: as above.
    if unsafe { libc::flock(raw, libc::LOCK_EX | libc::LOCK_NB) } != 0 {
        let err = io::Error::last_os_error();
        return Err(match err.raw_os_error() {
            Some(libc::EWOULDBLOCK) => PortError::AlreadyOpen,
            _ => PortError::io("flock", err),
        });
    }

    // SAFETY: F_GETFL takes no argument.
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFL) };
    if flags < 0 {
        return Err(PortError::last_os_error("fcntl(F_GETFL)"));
    }
    // SAFETY: F_SETFL takes an int of flags.
    if unsafe { libc::fcntl(raw, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(PortError::last_os_error("fcntl(F_SETFL)"));
    }

    Ok(fd)
}

/// Drop the exclusive-use lock, then the descriptor.
fn release(fd: OwnedFd) -> PortResult<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: `raw` is owned by `fd`, which is still alive here.
    let unlocked = unsafe { libc::flock(raw, libc::LOCK_UN) } == 0;
    let unlock_err = (!unlocked).then(|| PortError::last_os_error("flock(LOCK_UN)"));
    // SAFETY: as above; TIOCNXCL takes no argument.
    if unsafe { libc::ioctl(raw, libc::TIOCNXCL as _) } != 0 {
        debug!("TIOCNXCL failed: {}", io::Error::last_os_error());
    }

    let raw = fd.into_raw_fd();
    // SAFETY: ownership of `raw` was taken from `fd`, so it is closed exactly once.
    if unsafe { libc::close(raw) } != 0 {
        return Err(PortError::last_os_error("close"));
    }
    unlock_err.map_or(Ok(()), Err)
}

fn get_modem_bits(fd: RawFd) -> PortResult<c_int> {
    let mut bits: c_int = 0;
    // SAFETY: TIOCMGET writes one c_int through the pointer, which is live for the call.
    if unsafe { libc::ioctl(fd, libc::TIOCMGET as _, &mut bits as *mut c_int) } != 0 {
        return Err(PortError::last_os_error("TIOCMGET"));
    }
    Ok(bits)
}

fn set_modem_bits(fd: RawFd, bits: c_int) -> PortResult<()> {
    // SAFETY: TIOCMSET reads one c_int through the pointer, which is live for the call.
    if unsafe { libc::ioctl(fd, libc::TIOCMSET as _, &bits as *const c_int) } != 0 {
        return Err(PortError::last_os_error("TIOCMSET"));
    }
    Ok(())
}
