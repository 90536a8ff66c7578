//! Windows overlapped-I/O backend.
//!
//! A [`ComPort`] opens the device for overlapped I/O so a blocked read never
//! holds up a write, a modem-line change or a close. Each direction has its
//! own lock and its own manual-reset event; the handle itself sits behind a
//! reader/writer lock that only `close` takes exclusively.

pub mod comm_state;

#[cfg(windows)]
pub use native::ComPort;

#[cfg(windows)]
mod native {
    use super::comm_state::{
        self, CommState, OutputLine, MS_CTS_ON, MS_DSR_ON, MS_RING_ON, RX_QUEUE_SIZE,
        TX_QUEUE_SIZE,
    };
    use crate::port::error::{PortError, PortResult};
    use crate::port::tables;
    use crate::port::traits::{Port, SerialConfig};
    use parking_lot::{Mutex, RwLock};
    use std::ffi::OsStr;
    use std::io;
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;
    use std::time::Duration;
    use tracing::{debug, trace, warn};
    use winapi::shared::minwindef::{DWORD, FALSE, TRUE};
    use winapi::shared::winerror::{
        ERROR_ACCESS_DENIED, ERROR_IO_PENDING, ERROR_OPERATION_ABORTED, ERROR_SHARING_VIOLATION,
    };
    use winapi::um::commapi::{
        EscapeCommFunction, GetCommModemStatus, GetCommState, PurgeComm, SetCommMask,
        SetCommState, SetCommTimeouts, SetupComm,
    };
    use winapi::um::errhandlingapi::GetLastError;
    use winapi::um::fileapi::{CreateFileW, ReadFile, WriteFile, OPEN_EXISTING};
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::ioapiset::{CancelIoEx, GetOverlappedResult};
    use winapi::um::minwinbase::OVERLAPPED;
    use winapi::um::synchapi::{CreateEventW, ResetEvent};
    use winapi::um::winbase::{
        COMMTIMEOUTS, DCB, EV_RXCHAR, FILE_FLAG_OVERLAPPED, PURGE_RXABORT, PURGE_RXCLEAR,
        PURGE_TXABORT, PURGE_TXCLEAR,
    };
    use winapi::um::winnt::{CHAR, GENERIC_READ, GENERIC_WRITE, HANDLE};

    /// How long `close` waits for in-flight I/O before cancelling again.
    const CLOSE_RETRY: Duration = Duration::from_millis(50);

    /// Device handle. Win32 handles may be used from any thread.
    #[derive(Debug, Clone, Copy)]
    struct Handle(HANDLE);

    unsafe impl Send for Handle {}
    unsafe impl Sync for Handle {}

    /// One direction's overlapped block and its completion event.
    struct Overlapped {
        inner: OVERLAPPED,
    }

    unsafe impl Send for Overlapped {}

    impl Overlapped {
        fn new() -> PortResult<Self> {
            // Manual reset, initially clear, unnamed.
            let event = unsafe { CreateEventW(ptr::null_mut(), TRUE, FALSE, ptr::null()) };
            if event.is_null() {
                return Err(PortError::last_os_error("CreateEventW"));
            }
            let mut inner: OVERLAPPED = unsafe { mem::zeroed() };
            inner.hEvent = event;
            Ok(Self { inner })
        }

        /// Clear the block for the next request, keeping the event.
        fn rearm(&mut self) -> PortResult<()> {
            let event = self.inner.hEvent;
            self.inner = unsafe { mem::zeroed() };
            self.inner.hEvent = event;
            if unsafe { ResetEvent(event) } == FALSE {
                return Err(PortError::last_os_error("ResetEvent"));
            }
            Ok(())
        }
    }

    impl Drop for Overlapped {
        fn drop(&mut self) {
            unsafe { CloseHandle(self.inner.hEvent) };
        }
    }

    impl std::fmt::Debug for Overlapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Overlapped")
                .field("event", &self.inner.hEvent)
                .finish()
        }
    }

    /// Serial port on a Windows COM device.
    #[derive(Debug)]
    pub struct ComPort {
        name: String,
        handle: RwLock<Option<Handle>>,
        config: Mutex<SerialConfig>,
        reader: Mutex<Overlapped>,
        writer: Mutex<Overlapped>,
    }

    impl ComPort {
        /// Open and configure the device named in `config`.
        ///
        /// `COM3` and `\\.\COM12` are both accepted.
        pub fn open(config: &SerialConfig) -> PortResult<Self> {
            let config = config.clone();
            tables::validate(&config)?;
            let state = CommState::from_config(&config)?;
            let timeouts = comm_state::timeouts(config.read_timeout);

            let reader = Overlapped::new()?;
            let writer = Overlapped::new()?;

            let handle = open_device(&config.name)?;
            if let Err(e) = configure(handle, &state, &timeouts) {
                unsafe { CloseHandle(handle.0) };
                return Err(e);
            }

            debug!(
                "Opened {} at {} baud ({:?}, {:?}, {:?})",
                config.name, config.baud_rate, config.parity, config.stop_bits, config.flow_control
            );

            Ok(Self {
                name: config.name.clone(),
                handle: RwLock::new(Some(handle)),
                config: Mutex::new(config),
                reader: Mutex::new(reader),
                writer: Mutex::new(writer),
            })
        }

        fn with_handle<T>(&self, f: impl FnOnce(HANDLE) -> PortResult<T>) -> PortResult<T> {
            let guard = self.handle.read();
            let handle = guard.ok_or(PortError::NotOpen)?;
            f(handle.0)
        }

        fn drive_line(&self, line: OutputLine, enable: bool) -> PortResult<()> {
            let invert = self.config.lock().signal_invert;
            let code = comm_state::line_escape(line, enable, invert);
            self.with_handle(|h| escape(h, code))?;
            trace!("{} {:?} -> {}", self.name, line, enable);
            Ok(())
        }

        fn sense_line(&self, mask: DWORD) -> PortResult<bool> {
            let status = self.with_handle(modem_status)?;
            let invert = self.config.lock().signal_invert;
            Ok(comm_state::line_active(status, mask, invert))
        }
    }

    impl Port for ComPort {
        fn name(&self) -> &str {
            &self.name
        }

        fn config(&self) -> SerialConfig {
            self.config.lock().clone()
        }

        fn is_open(&self) -> bool {
            self.handle.read().is_some()
        }

        fn read(&self, buffer: &mut [u8]) -> PortResult<usize> {
            self.with_handle(|h| {
                let mut ov = self.reader.lock();
                ov.rearm()?;
                let len = buffer.len().min(DWORD::MAX as usize) as DWORD;
                let mut n: DWORD = 0;
                let ok = unsafe {
                    ReadFile(h, buffer.as_mut_ptr().cast(), len, &mut n, &mut ov.inner)
                };
                complete(h, &mut ov.inner, ok, "ReadFile")
            })
        }

        fn write(&self, data: &[u8]) -> PortResult<usize> {
            self.with_handle(|h| {
                let mut ov = self.writer.lock();
                ov.rearm()?;
                let len = data.len().min(DWORD::MAX as usize) as DWORD;
                let mut n: DWORD = 0;
                let ok = unsafe {
                    WriteFile(h, data.as_ptr().cast(), len, &mut n, &mut ov.inner)
                };
                complete(h, &mut ov.inner, ok, "WriteFile")
            })
        }

        fn close(&self) -> PortResult<()> {
            // Cancel under the shared lock so blocked reads and writes return
            // and release it; repeat until the exclusive lock is free.
            let mut guard = loop {
                {
                    let shared = self.handle.read();
                    let handle = shared.ok_or(PortError::NotOpen)?;
                    unsafe { CancelIoEx(handle.0, ptr::null_mut()) };
                }
                if let Some(guard) = self.handle.try_write_for(CLOSE_RETRY) {
                    break guard;
                }
            };

            let handle = guard.take().ok_or(PortError::NotOpen)?;
            if unsafe { CloseHandle(handle.0) } == FALSE {
                return Err(PortError::last_os_error("CloseHandle"));
            }
            debug!("Closed {}", self.name);
            Ok(())
        }

        fn rts(&self, enable: bool) -> PortResult<()> {
            self.drive_line(OutputLine::Rts, enable)
        }

        fn dtr(&self, enable: bool) -> PortResult<()> {
            self.drive_line(OutputLine::Dtr, enable)
        }

        fn cts(&self) -> PortResult<bool> {
            self.sense_line(MS_CTS_ON)
        }

        fn dsr(&self) -> PortResult<bool> {
            self.sense_line(MS_DSR_ON)
        }

        fn ring(&self) -> PortResult<bool> {
            self.sense_line(MS_RING_ON)
        }

        fn set_baud(&self, baud_rate: u32) -> PortResult<()> {
            tables::check_baud(baud_rate)?;
            self.with_handle(|h| {
                let mut dcb = comm_state_of(h)?;
                dcb.BaudRate = baud_rate;
                if unsafe { SetCommState(h, &mut dcb) } == FALSE {
                    return Err(PortError::last_os_error("SetCommState"));
                }
                Ok(())
            })?;
            self.config.lock().baud_rate = baud_rate;
            debug!("{} baud -> {}", self.name, baud_rate);
            Ok(())
        }

        fn signal_invert(&self, enable: bool) -> PortResult<()> {
            self.with_handle(|_| {
                self.config.lock().signal_invert = enable;
                Ok(())
            })
        }

        fn send_break(&self, enable: bool) -> PortResult<()> {
            self.with_handle(|h| escape(h, comm_state::break_escape(enable)))
        }
    }

    impl Drop for ComPort {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.get_mut().take() {
                unsafe {
                    CancelIoEx(handle.0, ptr::null_mut());
                    CloseHandle(handle.0);
                }
            }
        }
    }

    fn open_device(name: &str) -> PortResult<Handle> {
        let path: Vec<u16> = OsStr::new(&comm_state::device_path(name))
            .encode_wide()
            .chain(Some(0))
            .collect();

        let handle = unsafe {
            CreateFileW(
                path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_FLAG_OVERLAPPED,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            let code = unsafe { GetLastError() };
            return Err(match code {
                ERROR_ACCESS_DENIED => PortError::AccessDenied(name.to_string()),
                ERROR_SHARING_VIOLATION => PortError::AlreadyOpen,
                _ => PortError::io("CreateFileW", io::Error::from_raw_os_error(code as i32)),
            });
        }
        Ok(Handle(handle))
    }

    fn configure(
        handle: Handle,
        state: &CommState,
        timeouts: &comm_state::Timeouts,
    ) -> PortResult<()> {
        let h = handle.0;
        if unsafe { SetupComm(h, RX_QUEUE_SIZE, TX_QUEUE_SIZE) } == FALSE {
            return Err(PortError::last_os_error("SetupComm"));
        }

        let mut dcb = comm_state_of(h)?;
        dcb.BaudRate = state.baud_rate;
        dcb.BitFields = state.bit_fields;
        dcb.XonLim = state.xon_lim;
        dcb.XoffLim = state.xoff_lim;
        dcb.ByteSize = state.byte_size;
        dcb.Parity = state.parity;
        dcb.StopBits = state.stop_bits;
        dcb.XonChar = state.xon_char as CHAR;
        dcb.XoffChar = state.xoff_char as CHAR;
        if unsafe { SetCommState(h, &mut dcb) } == FALSE {
            return Err(PortError::last_os_error("SetCommState"));
        }

        let mut native = COMMTIMEOUTS {
            ReadIntervalTimeout: timeouts.read_interval,
            ReadTotalTimeoutMultiplier: timeouts.read_total_multiplier,
            ReadTotalTimeoutConstant: timeouts.read_total_constant,
            WriteTotalTimeoutMultiplier: timeouts.write_total_multiplier,
            WriteTotalTimeoutConstant: timeouts.write_total_constant,
        };
        if unsafe { SetCommTimeouts(h, &mut native) } == FALSE {
            return Err(PortError::last_os_error("SetCommTimeouts"));
        }

        if unsafe { SetCommMask(h, EV_RXCHAR) } == FALSE {
            return Err(PortError::last_os_error("SetCommMask"));
        }

        let purge = PURGE_RXABORT | PURGE_RXCLEAR | PURGE_TXABORT | PURGE_TXCLEAR;
        if unsafe { PurgeComm(h, purge) } == FALSE {
            warn!("PurgeComm failed: {}", io::Error::last_os_error());
        }
        Ok(())
    }

    fn comm_state_of(h: HANDLE) -> PortResult<DCB> {
        let mut dcb: DCB = unsafe { mem::zeroed() };
        dcb.DCBlength = mem::size_of::<DCB>() as DWORD;
        if unsafe { GetCommState(h, &mut dcb) } == FALSE {
            return Err(PortError::last_os_error("GetCommState"));
        }
        Ok(dcb)
    }

    /// Wait for an overlapped request issued with result `ok`.
    fn complete(
        h: HANDLE,
        ov: &mut OVERLAPPED,
        ok: i32,
        context: &'static str,
    ) -> PortResult<usize> {
        if ok == FALSE {
            let code = unsafe { GetLastError() };
            if code != ERROR_IO_PENDING {
                return Err(PortError::io(
                    context,
                    io::Error::from_raw_os_error(code as i32),
                ));
            }
        }

        let mut n: DWORD = 0;
        if unsafe { GetOverlappedResult(h, ov, &mut n, TRUE) } == FALSE {
            let code = unsafe { GetLastError() };
            if code == ERROR_OPERATION_ABORTED {
                // Cancelled by close().
                return Err(PortError::NotOpen);
            }
            return Err(PortError::io(
                "GetOverlappedResult",
                io::Error::from_raw_os_error(code as i32),
            ));
        }
        Ok(n as usize)
    }

    fn escape(h: HANDLE, code: u32) -> PortResult<()> {
        if unsafe { EscapeCommFunction(h, code) } == FALSE {
            return Err(PortError::last_os_error("EscapeCommFunction"));
        }
        Ok(())
    }

    fn modem_status(h: HANDLE) -> PortResult<DWORD> {
        let mut status: DWORD = 0;
        if unsafe { GetCommModemStatus(h, &mut status) } == FALSE {
            return Err(PortError::last_os_error("GetCommModemStatus"));
        }
        Ok(status)
    }
}
