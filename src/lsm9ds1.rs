// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Shared types for the LSM9DS1 driver: device addressing, register tables,
//! sample types, the consumer callback trait and the error type.

pub mod bits;
pub mod config;
pub mod driver;
pub mod interrupt;
pub mod transport;

pub use driver::Lsm9ds1;

use std::error;
use std::fmt;

/// Default 7-bit I2C address of the accelerometer/gyroscope peripheral.
pub const AG_ADDR: u8 = 0x6B;

/// Default 7-bit I2C address of the magnetometer peripheral.
pub const MAG_ADDR: u8 = 0x1E;

/// Default I2C bus number (most likely 1 on a Raspberry Pi).
pub const DEFAULT_I2C_BUS: u32 = 1;

/// WHO_AM_I response of the accelerometer/gyroscope peripheral.
pub(crate) const WHO_AM_I_AG_RSP: u8 = 0x68;

/// WHO_AM_I response of the magnetometer peripheral.
pub(crate) const WHO_AM_I_M_RSP: u8 = 0x3D;

// Raw codes substituted for a failed gyro/accel burst read. Distinct
// magnitudes so the two fault cases can be told apart downstream.
pub(crate) const GYRO_FAULT_RAW: i16 = 9999;
pub(crate) const ACCEL_FAULT_RAW: i16 = 999;

/// Hardware related settings: which bus and which 7-bit addresses the two
/// peripherals answer on. Fixed for the lifetime of the driver.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSettings {
    /// I2C bus number the package is wired to.
    pub i2c_bus: u32,
    /// Address of the accelerometer/gyroscope peripheral.
    pub ag_address: u8,
    /// Address of the magnetometer peripheral.
    pub mag_address: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            i2c_bus: DEFAULT_I2C_BUS,
            ag_address: AG_ADDR,
            mag_address: MAG_ADDR,
        }
    }
}

/// One sensor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Byte offset of this axis within a block of three little-endian
    /// 16-bit output registers.
    pub(crate) fn reg_offset(self) -> u8 {
        match self {
            Axis::X => 0,
            Axis::Y => 2,
            Axis::Z => 4,
        }
    }

    pub(crate) fn index(self) -> u8 {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Accelerometer/gyroscope register map (subset used by this driver).
#[derive(Debug, Clone, Copy)]
pub(crate) enum AgRegister {
    ActThs,
    ActDur,
    IntGenCfgXl,
    IntGenThsXXl,
    IntGenDurXl,
    Int1Ctrl,
    Int2Ctrl,
    WhoAmI,
    CtrlReg1G,
    CtrlReg2G,
    CtrlReg3G,
    OrientCfgG,
    IntGenSrcG,
    OutTempL,
    StatusReg0,
    OutXLG,
    CtrlReg4,
    CtrlReg5Xl,
    CtrlReg6Xl,
    CtrlReg7Xl,
    CtrlReg8,
    CtrlReg9,
    IntGenSrcXl,
    StatusReg1,
    OutXLXl,
    FifoCtrl,
    FifoSrc,
    IntGenCfgG,
    IntGenThsXHG,
    IntGenDurG,
}

impl AgRegister {
    pub(crate) fn addr(self) -> u8 {
        match self {
            AgRegister::ActThs => 0x04,
            AgRegister::ActDur => 0x05,
            AgRegister::IntGenCfgXl => 0x06,
            AgRegister::IntGenThsXXl => 0x07,
            AgRegister::IntGenDurXl => 0x0A,
            AgRegister::Int1Ctrl => 0x0C,
            AgRegister::Int2Ctrl => 0x0D,
            AgRegister::WhoAmI => 0x0F,
            AgRegister::CtrlReg1G => 0x10,
            AgRegister::CtrlReg2G => 0x11,
            AgRegister::CtrlReg3G => 0x12,
            AgRegister::OrientCfgG => 0x13,
            AgRegister::IntGenSrcG => 0x14,
            AgRegister::OutTempL => 0x15,
            AgRegister::StatusReg0 => 0x17,
            AgRegister::OutXLG => 0x18,
            AgRegister::CtrlReg4 => 0x1E,
            AgRegister::CtrlReg5Xl => 0x1F,
            AgRegister::CtrlReg6Xl => 0x20,
            AgRegister::CtrlReg7Xl => 0x21,
            AgRegister::CtrlReg8 => 0x22,
            AgRegister::CtrlReg9 => 0x23,
            AgRegister::IntGenSrcXl => 0x26,
            AgRegister::StatusReg1 => 0x27,
            AgRegister::OutXLXl => 0x28,
            AgRegister::FifoCtrl => 0x2E,
            AgRegister::FifoSrc => 0x2F,
            AgRegister::IntGenCfgG => 0x30,
            AgRegister::IntGenThsXHG => 0x31,
            AgRegister::IntGenDurG => 0x37,
        }
    }
}

/// Magnetometer register map (subset used by this driver).
#[derive(Debug, Clone, Copy)]
pub(crate) enum MagRegister {
    OffsetXRegLM,
    OffsetXRegHM,
    WhoAmI,
    CtrlReg1M,
    CtrlReg2M,
    CtrlReg3M,
    CtrlReg4M,
    CtrlReg5M,
    StatusRegM,
    OutXLM,
    IntCfgM,
    IntSrcM,
    IntThsLM,
    IntThsHM,
}

impl MagRegister {
    pub(crate) fn addr(self) -> u8 {
        match self {
            MagRegister::OffsetXRegLM => 0x05,
            MagRegister::OffsetXRegHM => 0x06,
            MagRegister::WhoAmI => 0x0F,
            MagRegister::CtrlReg1M => 0x20,
            MagRegister::CtrlReg2M => 0x21,
            MagRegister::CtrlReg3M => 0x22,
            MagRegister::CtrlReg4M => 0x23,
            MagRegister::CtrlReg5M => 0x24,
            MagRegister::StatusRegM => 0x27,
            MagRegister::OutXLM => 0x28,
            MagRegister::IntCfgM => 0x30,
            MagRegister::IntSrcM => 0x31,
            MagRegister::IntThsLM => 0x32,
            MagRegister::IntThsHM => 0x33,
        }
    }
}

/// Raw signed 16-bit ADC codes from one acquisition pass.
///
/// Produced atomically by a single pass over all enabled sub-sensors and
/// never partially updated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Gyroscope x code.
    pub gx: i16,
    /// Gyroscope y code.
    pub gy: i16,
    /// Gyroscope z code.
    pub gz: i16,
    /// Accelerometer x code.
    pub ax: i16,
    /// Accelerometer y code.
    pub ay: i16,
    /// Accelerometer z code.
    pub az: i16,
    /// Magnetometer x code.
    pub mx: i16,
    /// Magnetometer y code.
    pub my: i16,
    /// Magnetometer z code.
    pub mz: i16,
    /// Temperature code.
    pub temperature: i16,
}

/// One sample from the LSM9DS1 in physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// X acceleration in g.
    pub ax: f32,
    /// Y acceleration in g.
    pub ay: f32,
    /// Z acceleration in g.
    pub az: f32,
    /// X rotation in deg/s.
    pub gx: f32,
    /// Y rotation in deg/s.
    pub gy: f32,
    /// Z rotation in deg/s.
    pub gz: f32,
    /// X magnetic field in gauss.
    pub mx: f32,
    /// Y magnetic field in gauss.
    pub my: f32,
    /// Z magnetic field in gauss.
    pub mz: f32,
    /// Chip temperature in degrees Celsius, one decimal of resolution.
    pub temperature: f32,
}

/// Callback interface implemented by the host application.
///
/// Runs on the driver's only background thread, so it must not block
/// indefinitely; the sample is handed over by value and may be kept.
pub trait SampleHandler: Send {
    /// Called once per data-ready event with the completed sample.
    fn on_sample(&mut self, sample: Sample);
}

/// The possible errors the driver can return.
///
/// `Bus` wraps whatever error type the bus collaborator uses; a wrong 7-bit
/// address or an unpowered device typically surfaces here. `ShortRead`
/// means the bus returned fewer bytes than requested; no partial data is
/// ever handed on in that case.
pub enum Error<E> {
    /// An error occurred when using the bus.
    Bus(E),
    /// A block read returned fewer bytes than requested.
    ShortRead {
        /// Number of bytes requested from the bus.
        requested: usize,
        /// Number of bytes actually received.
        received: usize,
    },
    /// The WHO_AM_I registers did not identify an LSM9DS1; the combined
    /// (ag << 8 | m) value read back is attached.
    UnknownDevice(u16),
    /// `begin` was called while the acquisition thread is already running
    /// or after the data-ready subscription was consumed.
    AlreadyRunning,
    /// The data-ready edge source failed to subscribe or wait.
    DataReady(Box<dyn error::Error + Send + Sync>),
    /// The background acquisition thread could not be spawned.
    Thread(std::io::Error),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Bus(error)
    }
}

impl<E: fmt::Debug> fmt::Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "Bus({:?})", e),
            Error::ShortRead {
                requested,
                received,
            } => write!(f, "ShortRead {{ requested: {}, received: {} }}", requested, received),
            Error::UnknownDevice(id) => write!(f, "UnknownDevice({:#06x})", id),
            Error::AlreadyRunning => write!(f, "AlreadyRunning"),
            Error::DataReady(e) => write!(f, "DataReady({:?})", e),
            Error::Thread(e) => write!(f, "Thread({:?})", e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus transaction failed: {:?}", e),
            Error::ShortRead {
                requested,
                received,
            } => write!(
                f,
                "short read: requested {} byte(s), received {}",
                requested, received
            ),
            Error::UnknownDevice(id) => {
                write!(f, "WHO_AM_I returned {:#06x}, not an LSM9DS1", id)
            }
            Error::AlreadyRunning => write!(f, "acquisition already started"),
            Error::DataReady(e) => write!(f, "data-ready line error: {}", e),
            Error::Thread(e) => write!(f, "could not spawn acquisition thread: {}", e),
        }
    }
}

impl<E: fmt::Debug> error::Error for Error<E> {}
