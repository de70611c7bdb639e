// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! In-memory bus and edge-source doubles for the integration tests.

use std::collections::{HashMap, HashSet};
use std::error;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lsm9ds1_driver::lsm9ds1::interrupt::{EdgeEvents, EdgeSource, EdgeWait};
use lsm9ds1_driver::lsm9ds1::transport::{BusSession, I2cBus};
use lsm9ds1_driver::lsm9ds1::{Sample, SampleHandler, AG_ADDR, MAG_ADDR};

pub const AG: u8 = AG_ADDR;
pub const MAG: u8 = MAG_ADDR;

/// Route driver logs to the test output; `RUST_LOG=debug` shows them.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Error type of the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

#[derive(Default)]
struct State {
    registers: HashMap<(u8, u8), u8>,
    /// Burst reads starting at these (address, register) pairs fail.
    failing: HashSet<(u8, u8)>,
    /// Burst reads starting at these pairs return this many bytes.
    short: HashMap<(u8, u8), usize>,
    writes: Vec<(u8, u8, u8)>,
    reads: usize,
}

/// Register-map bus double. Clones share state, so the copy moved into the
/// driver stays observable from the test.
#[derive(Clone)]
pub struct MockBus {
    state: Arc<Mutex<State>>,
}

impl MockBus {
    /// A bus with both WHO_AM_I registers answering as an LSM9DS1.
    pub fn new() -> Self {
        let bus = MockBus {
            state: Arc::new(Mutex::new(State::default())),
        };
        bus.set(AG, 0x0F, 0x68);
        bus.set(MAG, 0x0F, 0x3D);
        bus
    }

    pub fn set(&self, address: u8, register: u8, value: u8) {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert((address, register), value);
    }

    /// Place a signed 16-bit code into a little-endian register pair.
    pub fn set_word(&self, address: u8, low_register: u8, value: i16) {
        let [low, high] = value.to_le_bytes();
        self.set(address, low_register, low);
        self.set(address, low_register + 1, high);
    }

    pub fn fail_reads_at(&self, address: u8, register: u8) {
        self.state.lock().unwrap().failing.insert((address, register));
    }

    pub fn restore_reads_at(&self, address: u8, register: u8) {
        self.state.lock().unwrap().failing.remove(&(address, register));
    }

    pub fn short_reads_at(&self, address: u8, register: u8, received: usize) {
        self.state
            .lock()
            .unwrap()
            .short
            .insert((address, register), received);
    }

    /// Current register value as seen through writes.
    pub fn reg(&self, address: u8, register: u8) -> u8 {
        self.state
            .lock()
            .unwrap()
            .registers
            .get(&(address, register))
            .copied()
            .unwrap_or(0)
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }
}

pub struct MockSession {
    state: Arc<Mutex<State>>,
    address: u8,
}

impl I2cBus for MockBus {
    type Error = BusFault;
    type Session = MockSession;

    fn open(&mut self, _bus: u32, address: u8) -> Result<MockSession, BusFault> {
        Ok(MockSession {
            state: Arc::clone(&self.state),
            address,
        })
    }
}

impl BusSession for MockSession {
    type Error = BusFault;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), BusFault> {
        let mut state = self.state.lock().unwrap();
        state.writes.push((self.address, register, value));
        state.registers.insert((self.address, register), value);
        Ok(())
    }

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, BusFault> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.failing.contains(&(self.address, register)) {
            return Err(BusFault);
        }
        let n = state
            .short
            .get(&(self.address, register))
            .copied()
            .unwrap_or(buf.len());
        for (i, slot) in buf.iter_mut().enumerate().take(n) {
            *slot = state
                .registers
                .get(&(self.address, register + i as u8))
                .copied()
                .unwrap_or(0);
        }
        Ok(n)
    }
}

/// Error type of the mock edge source.
#[derive(Debug)]
pub struct EdgeFault;

impl fmt::Display for EdgeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge source disconnected")
    }
}

impl error::Error for EdgeFault {}

/// Edge source backed by a channel; every message sent on the paired
/// [`Sender`] is one rising edge.
pub struct MockEdgeSource {
    rx: Receiver<()>,
}

pub struct MockEdges {
    rx: Receiver<()>,
}

/// Create an edge source together with the sender that raises edges on it.
pub fn edge_pair() -> (Sender<()>, MockEdgeSource) {
    let (tx, rx) = mpsc::channel();
    (tx, MockEdgeSource { rx })
}

impl EdgeSource for MockEdgeSource {
    type Error = EdgeFault;
    type Events = MockEdges;

    fn subscribe(self) -> Result<MockEdges, EdgeFault> {
        Ok(MockEdges { rx: self.rx })
    }
}

impl EdgeEvents for MockEdges {
    type Error = EdgeFault;

    fn wait(&mut self, timeout: Duration) -> Result<EdgeWait, EdgeFault> {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(EdgeWait::Edge),
            Err(RecvTimeoutError::Timeout) => Ok(EdgeWait::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(EdgeFault),
        }
    }
}

/// Handler forwarding every sample to the test thread.
pub struct Recorder {
    tx: Sender<Sample>,
}

impl Recorder {
    pub fn channel() -> (Box<Recorder>, Receiver<Sample>) {
        let (tx, rx) = mpsc::channel();
        (Box::new(Recorder { tx }), rx)
    }
}

impl SampleHandler for Recorder {
    fn on_sample(&mut self, sample: Sample) {
        let _ = self.tx.send(sample);
    }
}

/// Handler that panics on its first invocation and records afterwards.
pub struct PanicThenRecord {
    calls: usize,
    tx: Sender<Sample>,
}

impl PanicThenRecord {
    pub fn channel() -> (Box<PanicThenRecord>, Receiver<Sample>) {
        let (tx, rx) = mpsc::channel();
        (Box::new(PanicThenRecord { calls: 0, tx }), rx)
    }
}

impl SampleHandler for PanicThenRecord {
    fn on_sample(&mut self, sample: Sample) {
        self.calls += 1;
        if self.calls == 1 {
            panic!("first sample");
        }
        let _ = self.tx.send(sample);
    }
}
