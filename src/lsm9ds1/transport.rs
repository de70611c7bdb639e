// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Bus collaborator traits and the register transaction layer.
//!
//! The driver never holds a bus session across calls: every register access
//! opens a transient session scoped to that single transaction and releases
//! it on every exit path, success or failure, by dropping it. The concrete
//! transport (on Linux typically one `open`/`ioctl` pair on `/dev/i2c-N`
//! per transaction) lives behind [`I2cBus`].

use crate::lsm9ds1::Error;

/// A register-oriented serial bus able to open per-transaction sessions to
/// a 7-bit peripheral address.
pub trait I2cBus {
    /// Transport error type.
    type Error;
    /// One open transaction scope. Closing happens on drop.
    type Session: BusSession<Error = Self::Error>;

    /// Open a session to `address` on bus number `bus`.
    fn open(&mut self, bus: u32, address: u8) -> Result<Self::Session, Self::Error>;
}

/// One open bus session, valid for a single register transaction.
pub trait BusSession {
    /// Transport error type.
    type Error;

    /// Write one byte to `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Read up to `buf.len()` bytes starting at `register`, the device
    /// auto-incrementing the register address. Returns the number of bytes
    /// actually received; the transaction layer treats anything short as a
    /// failure. Multi-byte quantities arrive low byte first.
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Register transaction layer on top of an [`I2cBus`].
///
/// Each call opens a fresh session for exactly one transaction. Short reads
/// are reported as [`Error::ShortRead`] and never yield partial data.
#[derive(Debug)]
pub(crate) struct RegisterIo<B> {
    bus: B,
    bus_number: u32,
}

impl<B: I2cBus> RegisterIo<B> {
    pub(crate) fn new(bus: B, bus_number: u32) -> Self {
        RegisterIo { bus, bus_number }
    }

    /// Read a single byte from `register` of the peripheral at `address`.
    pub(crate) fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Error<B::Error>> {
        let mut buf = [0u8; 1];
        self.read_block(address, register, &mut buf)?;
        Ok(buf[0])
    }

    /// Burst-read `buf.len()` consecutive registers starting at `register`.
    pub(crate) fn read_block(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        let mut session = self.bus.open(self.bus_number, address)?;
        let received = session.read_registers(register, buf)?;
        if received != buf.len() {
            return Err(Error::ShortRead {
                requested: buf.len(),
                received,
            });
        }
        Ok(())
    }

    /// Write a single byte to `register` of the peripheral at `address`.
    pub(crate) fn write_byte(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), Error<B::Error>> {
        let mut session = self.bus.open(self.bus_number, address)?;
        Ok(session.write_register(register, value)?)
    }
}

/// Combine a little-endian register pair into a signed 16-bit code. The
/// high byte is the second byte received.
pub(crate) fn combine(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}
