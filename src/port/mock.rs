//! Mock serial port implementation for testing.
//!
//! Provides a [`MockPort`] that simulates a serial line without hardware:
//! queued receive data, a log of every write together with the modem lines
//! at that moment, simulated input lines, optional loopback wiring and
//! failure injection.

use super::error::{PortError, PortResult};
use super::tables;
use super::traits::{Port, SerialConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Instant;

/// One call to [`Port::write`] as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub data: Vec<u8>,
    /// Electrical RTS level while the write ran.
    pub rts: bool,
    /// Electrical DTR level while the write ran.
    pub dtr: bool,
}

/// Something that happened on the mock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// RTS driven to the given electrical level.
    Rts(bool),
    /// DTR driven to the given electrical level.
    Dtr(bool),
    Write(Vec<u8>),
    Read(usize),
    Break(bool),
    Baud(u32),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub at: Instant,
    pub kind: EventKind,
}

#[derive(Debug)]
struct MockState {
    open: bool,
    config: SerialConfig,
    read_queue: VecDeque<u8>,
    write_log: Vec<WriteRecord>,
    events: Vec<Event>,
    rts: bool,
    dtr: bool,
    cts_in: bool,
    dsr_in: bool,
    ring_in: bool,
    break_active: bool,
    loopback: bool,
    write_failure: Option<io::ErrorKind>,
    rts_failure: Option<bool>,
}

impl MockState {
    fn new(config: SerialConfig) -> Self {
        Self {
            open: true,
            config,
            read_queue: VecDeque::new(),
            write_log: Vec::new(),
            events: Vec::new(),
            rts: false,
            dtr: false,
            cts_in: false,
            dsr_in: false,
            ring_in: false,
            break_active: false,
            loopback: false,
            write_failure: None,
            rts_failure: None,
        }
    }

    fn ensure_open(&self) -> PortResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(PortError::NotOpen)
        }
    }

    fn record(&mut self, kind: EventKind) {
        self.events.push(Event {
            at: Instant::now(),
            kind,
        });
    }

    fn level(&self, physical: bool) -> bool {
        physical ^ self.config.signal_invert
    }
}

/// In-memory [`Port`] for tests.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the code under test owns another.
///
/// # Example
/// ```
/// use embserial::port::{MockPort, Port};
///
/// let port = MockPort::loopback("MOCK0");
/// port.write(b"Hari Aum")?;
///
/// let mut buffer = [0u8; 8];
/// let n = port.read(&mut buffer)?;
/// assert_eq!(&buffer[..n], b"Hari Aum");
/// assert_eq!(port.write_log().len(), 1);
/// # Ok::<(), embserial::port::PortError>(())
/// ```
#[derive(Clone)]
pub struct MockPort {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockPort {
    /// Open mock port with a default 9600 8N1 configuration.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            state: Arc::new(Mutex::new(MockState::new(SerialConfig::new(name.clone())))),
            name,
        }
    }

    /// Open a mock port, validating `config` like a real backend would.
    pub fn open(config: &SerialConfig) -> PortResult<Self> {
        tables::validate(config)?;
        Ok(Self {
            name: config.name.clone(),
            state: Arc::new(Mutex::new(MockState::new(config.clone()))),
        })
    }

    /// Mock port with TX wired to RX, RTS to CTS and DTR to DSR.
    pub fn loopback(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.set_loopback(true);
        port
    }

    pub fn set_loopback(&self, enable: bool) {
        self.state.lock().loopback = enable;
    }

    /// Queue bytes for subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    pub fn write_log(&self) -> Vec<WriteRecord> {
        self.state.lock().write_log.clone()
    }

    /// Every byte written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        let state = self.state.lock();
        state
            .write_log
            .iter()
            .flat_map(|record| record.data.iter().copied())
            .collect()
    }

    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Timestamped journal of line changes, reads, writes and closes.
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Electrical RTS level.
    pub fn rts_level(&self) -> bool {
        self.state.lock().rts
    }

    /// Electrical DTR level.
    pub fn dtr_level(&self) -> bool {
        self.state.lock().dtr
    }

    pub fn break_active(&self) -> bool {
        self.state.lock().break_active
    }

    /// Electrical CTS level presented by the far end. Ignored in loopback.
    pub fn set_cts(&self, level: bool) {
        self.state.lock().cts_in = level;
    }

    /// Electrical DSR level presented by the far end. Ignored in loopback.
    pub fn set_dsr(&self, level: bool) {
        self.state.lock().dsr_in = level;
    }

    pub fn set_ring(&self, level: bool) {
        self.state.lock().ring_in = level;
    }

    /// Make every write fail with `kind` until cleared with `None`.
    pub fn fail_writes(&self, kind: Option<io::ErrorKind>) {
        self.state.lock().write_failure = kind;
    }

    /// Make requests to drive RTS to the logical level `level` fail.
    pub fn fail_rts_on(&self, level: Option<bool>) {
        self.state.lock().rts_failure = level;
    }
}

impl Port for MockPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> SerialConfig {
        self.state.lock().config.clone()
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn read(&self, buffer: &mut [u8]) -> PortResult<usize> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        state.record(EventKind::Read(n));
        Ok(n)
    }

    fn write(&self, data: &[u8]) -> PortResult<usize> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        if let Some(kind) = state.write_failure {
            return Err(PortError::io(
                "write",
                io::Error::new(kind, "injected write failure"),
            ));
        }

        let record = WriteRecord {
            data: data.to_vec(),
            rts: state.rts,
            dtr: state.dtr,
        };
        state.write_log.push(record);
        if state.loopback {
            state.read_queue.extend(data);
        }
        state.record(EventKind::Write(data.to_vec()));
        Ok(data.len())
    }

    fn close(&self) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.open = false;
        state.record(EventKind::Closed);
        Ok(())
    }

    fn rts(&self, enable: bool) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if state.rts_failure == Some(enable) {
            return Err(PortError::io(
                "TIOCMSET",
                io::Error::new(io::ErrorKind::Other, "injected RTS failure"),
            ));
        }
        let level = state.level(enable);
        state.rts = level;
        state.record(EventKind::Rts(level));
        Ok(())
    }

    fn dtr(&self, enable: bool) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let level = state.level(enable);
        state.dtr = level;
        state.record(EventKind::Dtr(level));
        Ok(())
    }

    fn cts(&self) -> PortResult<bool> {
        let state = self.state.lock();
        state.ensure_open()?;
        let physical = if state.loopback { state.rts } else { state.cts_in };
        Ok(state.level(physical))
    }

    fn dsr(&self) -> PortResult<bool> {
        let state = self.state.lock();
        state.ensure_open()?;
        let physical = if state.loopback { state.dtr } else { state.dsr_in };
        Ok(state.level(physical))
    }

    fn ring(&self) -> PortResult<bool> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.level(state.ring_in))
    }

    fn set_baud(&self, baud_rate: u32) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        tables::check_baud(baud_rate)?;
        state.config.baud_rate = baud_rate;
        state.record(EventKind::Baud(baud_rate));
        Ok(())
    }

    fn signal_invert(&self, enable: bool) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.config.signal_invert = enable;
        Ok(())
    }

    fn send_break(&self, enable: bool) -> PortResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.break_active = enable;
        state.record(EventKind::Break(enable));
        Ok(())
    }
}

impl std::fmt::Debug for MockPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
