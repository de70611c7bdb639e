// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! The LSM9DS1 driver proper: device bring-up, configuration mutation,
//! manual polling reads and the interrupt-driven acquisition engine.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

use crate::lsm9ds1::bits::{AgStatus, FifoSource, MagStatus};
use crate::lsm9ds1::config::{
    int_gen, temp_to_celsius, AccelSampleRate, AccelScale, AccelSettings, ActiveLevel, FifoMode,
    GyroSampleRate, GyroScale, GyroSettings, IntSelect, MagSampleRate, MagScale, MagSettings,
    PinMode, TempSettings,
};
use crate::lsm9ds1::interrupt::{EdgeEvents, EdgeSource, EdgeWait};
use crate::lsm9ds1::transport::{combine, I2cBus, RegisterIo};
use crate::lsm9ds1::{
    AgRegister, Axis, DeviceSettings, Error, MagRegister, RawSample, Sample, SampleHandler,
    ACCEL_FAULT_RAW, GYRO_FAULT_RAW, WHO_AM_I_AG_RSP, WHO_AM_I_M_RSP,
};

// Bounded wait so the acquisition thread can notice the stop flag; not an
// application-visible deadline.
const EDGE_WAIT_TIMEOUT: Duration = Duration::from_millis(250);

type Handler = Arc<Mutex<Option<Box<dyn SampleHandler>>>>;

/// Locks without propagating poisoning; a panicking callback is already
/// contained by the worker, device state stays usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Device state shared between the caller thread and the acquisition
/// thread: the transaction layer, the active settings and the resolutions
/// derived from the last successfully written scale registers.
struct Core<B> {
    io: RegisterIo<B>,
    device: DeviceSettings,
    gyro: GyroSettings,
    accel: AccelSettings,
    mag: MagSettings,
    temp: TempSettings,
    g_res: f32,
    a_res: f32,
    m_res: f32,
}

impl<B: I2cBus> Core<B> {
    fn ag_read_byte(&mut self, reg: AgRegister) -> Result<u8, Error<B::Error>> {
        let address = self.device.ag_address;
        self.io.read_byte(address, reg.addr())
    }

    fn ag_write_byte(&mut self, reg: AgRegister, value: u8) -> Result<(), Error<B::Error>> {
        let address = self.device.ag_address;
        self.io.write_byte(address, reg.addr(), value)
    }

    fn ag_read_block(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        let address = self.device.ag_address;
        self.io.read_block(address, start, buf)
    }

    fn m_read_byte(&mut self, reg: MagRegister) -> Result<u8, Error<B::Error>> {
        let address = self.device.mag_address;
        self.io.read_byte(address, reg.addr())
    }

    fn m_write_byte(&mut self, reg: MagRegister, value: u8) -> Result<(), Error<B::Error>> {
        let address = self.device.mag_address;
        self.io.write_byte(address, reg.addr(), value)
    }

    fn m_write_raw(&mut self, register: u8, value: u8) -> Result<(), Error<B::Error>> {
        let address = self.device.mag_address;
        self.io.write_byte(address, register, value)
    }

    fn m_read_block(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        let address = self.device.mag_address;
        self.io.read_block(address, start, buf)
    }

    /// Read both WHO_AM_I registers and compare the concatenation against
    /// the expected response.
    fn verify_identity(&mut self) -> Result<(), Error<B::Error>> {
        let m = self.m_read_byte(MagRegister::WhoAmI)?;
        let xg = self.ag_read_byte(AgRegister::WhoAmI)?;
        let combined = u16::from(xg) << 8 | u16::from(m);
        let expected = u16::from(WHO_AM_I_AG_RSP) << 8 | u16::from(WHO_AM_I_M_RSP);
        if combined != expected {
            return Err(Error::UnknownDevice(combined));
        }
        debug!("WHO_AM_I verified: {:#06x}", combined);
        Ok(())
    }

    /// Bring-up writes every gyro control register to its full intended
    /// byte; register contents are undefined at power-on, so no
    /// read-modify-write here. Also arms the accelerometer data-ready
    /// signal on the INT2 pin.
    fn init_gyro(&mut self) -> Result<(), Error<B::Error>> {
        let gyro = self.gyro;
        self.ag_write_byte(AgRegister::CtrlReg1G, gyro.ctrl_reg1())?;
        self.ag_write_byte(AgRegister::CtrlReg2G, 0x00)?;
        self.ag_write_byte(AgRegister::CtrlReg3G, gyro.ctrl_reg3())?;
        self.ag_write_byte(AgRegister::CtrlReg4, gyro.ctrl_reg4())?;
        self.ag_write_byte(AgRegister::OrientCfgG, gyro.orient_cfg())?;
        self.ag_write_byte(AgRegister::Int2Ctrl, int_gen::DRDY_XL)
    }

    fn init_accel(&mut self) -> Result<(), Error<B::Error>> {
        let accel = self.accel;
        self.ag_write_byte(AgRegister::CtrlReg5Xl, accel.ctrl_reg5())?;
        self.ag_write_byte(AgRegister::CtrlReg6Xl, accel.ctrl_reg6())?;
        self.ag_write_byte(AgRegister::CtrlReg7Xl, accel.ctrl_reg7())
    }

    fn init_mag(&mut self) -> Result<(), Error<B::Error>> {
        let mag = self.mag;
        self.m_write_byte(MagRegister::CtrlReg1M, mag.ctrl_reg1())?;
        self.m_write_byte(MagRegister::CtrlReg2M, mag.ctrl_reg2())?;
        self.m_write_byte(MagRegister::CtrlReg3M, mag.ctrl_reg3())?;
        self.m_write_byte(MagRegister::CtrlReg4M, mag.ctrl_reg4())?;
        self.m_write_byte(MagRegister::CtrlReg5M, mag.ctrl_reg5())
    }

    fn read_gyro_block(&mut self) -> Result<(i16, i16, i16), Error<B::Error>> {
        let mut buf = [0u8; 6];
        self.ag_read_block(AgRegister::OutXLG.addr(), &mut buf)?;
        Ok((
            combine(buf[0], buf[1]),
            combine(buf[2], buf[3]),
            combine(buf[4], buf[5]),
        ))
    }

    fn read_accel_block(&mut self) -> Result<(i16, i16, i16), Error<B::Error>> {
        let mut buf = [0u8; 6];
        self.ag_read_block(AgRegister::OutXLXl.addr(), &mut buf)?;
        Ok((
            combine(buf[0], buf[1]),
            combine(buf[2], buf[3]),
            combine(buf[4], buf[5]),
        ))
    }

    fn read_mag_block(&mut self) -> Result<(i16, i16, i16), Error<B::Error>> {
        let mut buf = [0u8; 6];
        self.m_read_block(MagRegister::OutXLM.addr(), &mut buf)?;
        Ok((
            combine(buf[0], buf[1]),
            combine(buf[2], buf[3]),
            combine(buf[4], buf[5]),
        ))
    }

    fn read_temp_code(&mut self) -> Result<i16, Error<B::Error>> {
        let mut buf = [0u8; 2];
        self.ag_read_block(AgRegister::OutTempL.addr(), &mut buf)?;
        Ok(combine(buf[0], buf[1]))
    }

    /// One acquisition pass over all enabled sub-sensors.
    ///
    /// A failed gyro or accel burst read substitutes fixed raw fault codes
    /// and the pass continues; one bad transaction must not stop the
    /// stream. Magnetometer and temperature failures propagate out of the
    /// pass.
    fn sample_pass(&mut self) -> Result<Sample, Error<B::Error>> {
        let mut raw = RawSample::default();

        match self.read_gyro_block() {
            Ok((x, y, z)) => {
                raw.gx = x;
                raw.gy = y;
                raw.gz = z;
            }
            Err(_) => {
                raw.gx = GYRO_FAULT_RAW;
                raw.gy = GYRO_FAULT_RAW;
                raw.gz = GYRO_FAULT_RAW;
            }
        }

        match self.read_accel_block() {
            Ok((x, y, z)) => {
                raw.ax = x;
                raw.ay = y;
                raw.az = z;
            }
            Err(_) => {
                raw.ax = ACCEL_FAULT_RAW;
                raw.ay = ACCEL_FAULT_RAW;
                raw.az = ACCEL_FAULT_RAW;
            }
        }

        if self.mag.enabled {
            let (x, y, z) = self.read_mag_block()?;
            raw.mx = x;
            raw.my = y;
            raw.mz = z;
        }

        if self.temp.enabled {
            raw.temperature = self.read_temp_code()?;
        }

        Ok(self.convert(&raw))
    }

    fn convert(&self, raw: &RawSample) -> Sample {
        Sample {
            gx: self.g_res * f32::from(raw.gx),
            gy: self.g_res * f32::from(raw.gy),
            gz: self.g_res * f32::from(raw.gz),
            ax: self.a_res * f32::from(raw.ax),
            ay: self.a_res * f32::from(raw.ay),
            az: self.a_res * f32::from(raw.az),
            mx: self.m_res * f32::from(raw.mx),
            my: self.m_res * f32::from(raw.my),
            mz: self.m_res * f32::from(raw.mz),
            temperature: temp_to_celsius(raw.temperature),
        }
    }

    fn set_gyro_scale(&mut self, scale: GyroScale) -> Result<(), Error<B::Error>> {
        let mut value = self.ag_read_byte(AgRegister::CtrlReg1G)?;
        value &= 0xE7;
        value |= scale.bits() << 3;
        self.ag_write_byte(AgRegister::CtrlReg1G, value)?;
        self.gyro.scale = scale;
        // Resolution follows the register, never a pending value.
        self.g_res = scale.resolution();
        Ok(())
    }

    fn set_accel_scale(&mut self, scale: AccelScale) -> Result<(), Error<B::Error>> {
        let mut value = self.ag_read_byte(AgRegister::CtrlReg6Xl)?;
        value &= 0xE7;
        value |= scale.bits() << 3;
        self.ag_write_byte(AgRegister::CtrlReg6Xl, value)?;
        self.accel.scale = scale;
        self.a_res = scale.resolution();
        Ok(())
    }

    fn set_mag_scale(&mut self, scale: MagScale) -> Result<(), Error<B::Error>> {
        let mut value = self.m_read_byte(MagRegister::CtrlReg2M)?;
        value &= !(0x03 << 5);
        value |= scale.bits() << 5;
        self.m_write_byte(MagRegister::CtrlReg2M, value)?;
        self.mag.scale = scale;
        self.m_res = scale.resolution();
        Ok(())
    }

    fn set_gyro_odr(&mut self, rate: GyroSampleRate) -> Result<(), Error<B::Error>> {
        let mut value = self.ag_read_byte(AgRegister::CtrlReg1G)?;
        value &= !(0x07 << 5);
        value |= (rate.bits() & 0x07) << 5;
        self.ag_write_byte(AgRegister::CtrlReg1G, value)?;
        self.gyro.sample_rate = rate;
        Ok(())
    }

    fn set_accel_odr(&mut self, rate: AccelSampleRate) -> Result<(), Error<B::Error>> {
        let mut value = self.ag_read_byte(AgRegister::CtrlReg6Xl)?;
        value &= 0x1F;
        value |= (rate.bits() & 0x07) << 5;
        self.ag_write_byte(AgRegister::CtrlReg6Xl, value)?;
        self.accel.sample_rate = rate;
        Ok(())
    }

    fn set_mag_odr(&mut self, rate: MagSampleRate) -> Result<(), Error<B::Error>> {
        let mut value = self.m_read_byte(MagRegister::CtrlReg1M)?;
        value &= !(0x07 << 2);
        value |= (rate.bits() & 0x07) << 2;
        self.m_write_byte(MagRegister::CtrlReg1M, value)?;
        self.mag.sample_rate = rate;
        Ok(())
    }
}

/// Main driver type for the LSM9DS1.
///
/// Generic over the bus collaborator `B` and the data-ready edge source
/// `S`. Construct with [`new`](Lsm9ds1::new), register a
/// [`SampleHandler`], call [`begin`](Lsm9ds1::begin) to bring the device
/// up and start acquisition, and [`end`](Lsm9ds1::end) to stop it.
///
/// Mixing the manual polling reads with a running acquisition on the same
/// sub-sensor is not synchronized; callers are expected to use one access
/// pattern at a time.
pub struct Lsm9ds1<B, S>
where
    B: I2cBus,
    S: EdgeSource,
{
    core: Arc<Mutex<Core<B>>>,
    handler: Handler,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    drdy: Option<S>,
}

impl<B, S> Lsm9ds1<B, S>
where
    B: I2cBus + Send + 'static,
    B::Error: fmt::Debug + Send + 'static,
    S: EdgeSource,
{
    /// Create a new driver from the device settings, the bus collaborator
    /// and the data-ready edge source. No bus traffic happens here.
    pub fn new(device: DeviceSettings, bus: B, drdy: S) -> Self {
        debug!(
            "LSM9DS1: bus={:02x}, agAddr={:02x}, mAddr={:02x}",
            device.i2c_bus, device.ag_address, device.mag_address
        );
        let io = RegisterIo::new(bus, device.i2c_bus);
        let gyro = GyroSettings::default();
        let accel = AccelSettings::default();
        let mag = MagSettings::default();
        Lsm9ds1 {
            core: Arc::new(Mutex::new(Core {
                io,
                device,
                g_res: gyro.scale.resolution(),
                a_res: accel.scale.resolution(),
                m_res: mag.scale.resolution(),
                gyro,
                accel,
                mag,
                temp: TempSettings::default(),
            })),
            handler: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            drdy: Some(drdy),
        }
    }

    /// Register the callback which receives the samples at the sampling
    /// rate. Replaces any previous handler; takes effect on the next
    /// data-ready event. Without a handler, edges are consumed but no bus
    /// reads happen.
    pub fn set_handler(&self, handler: Box<dyn SampleHandler>) {
        *lock(&self.handler) = Some(handler);
    }

    /// Remove the registered callback, if any.
    pub fn clear_handler(&self) {
        *lock(&self.handler) = None;
    }

    /// Initialize the gyro, accelerometer and magnetometer and start the
    /// acquisition.
    ///
    /// Verifies the WHO_AM_I identity of both peripherals, programs every
    /// control register, subscribes to the data-ready rising edge and
    /// spawns the acquisition thread. If identity verification or any
    /// bring-up write fails, the driver stays idle and `begin` may be
    /// called again. Once acquisition has started, the data-ready
    /// subscription is consumed and further `begin` calls return
    /// [`Error::AlreadyRunning`].
    pub fn begin(
        &mut self,
        gyro: GyroSettings,
        accel: AccelSettings,
        mag: MagSettings,
        temp: TempSettings,
    ) -> Result<(), Error<B::Error>> {
        if self.worker.is_some() || self.drdy.is_none() {
            return Err(Error::AlreadyRunning);
        }

        {
            let mut core = lock(&self.core);
            core.gyro = gyro;
            core.accel = accel;
            core.mag = mag;
            core.temp = temp;

            core.verify_identity()?;
            core.init_gyro()?;
            core.init_accel()?;
            core.init_mag()?;

            // Scale registers are now written; derive the resolutions.
            core.g_res = gyro.scale.resolution();
            core.a_res = accel.scale.resolution();
            core.m_res = mag.scale.resolution();
        }

        // The edge source is consumed only once bring-up has succeeded, so
        // a failed begin leaves the driver idle and retryable.
        let drdy = self.drdy.take().ok_or(Error::AlreadyRunning)?;
        let events = drdy
            .subscribe()
            .map_err(|e| Error::DataReady(Box::new(e)))?;

        self.running.store(true, Ordering::SeqCst);
        let core = Arc::clone(&self.core);
        let handler = Arc::clone(&self.handler);
        let running = Arc::clone(&self.running);
        let worker = thread::Builder::new()
            .name("lsm9ds1-drdy".into())
            .spawn(move || acquisition_loop(events, core, handler, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                Error::Thread(e)
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Start acquisition with default settings for all four channels.
    pub fn begin_with_defaults(&mut self) -> Result<(), Error<B::Error>> {
        self.begin(
            GyroSettings::default(),
            AccelSettings::default(),
            MagSettings::default(),
            TempSettings::default(),
        )
    }

    /// End the data acquisition.
    ///
    /// Waits for any in-flight callback invocation to finish; no callback
    /// fires after this returns. Safe to call any number of times and
    /// called implicitly on drop.
    pub fn end(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("acquisition thread panicked");
            }
        }
    }

    /// Whether the acquisition thread is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    // ----------------- Polling access ----------------- //

    /// Polls the accelerometer status register for new data.
    pub fn accel_available(&self) -> Result<bool, Error<B::Error>> {
        let status = lock(&self.core).ag_read_byte(AgRegister::StatusReg1)?;
        Ok(AgStatus(status).accel_ready())
    }

    /// Polls the gyroscope status register for new data.
    pub fn gyro_available(&self) -> Result<bool, Error<B::Error>> {
        let status = lock(&self.core).ag_read_byte(AgRegister::StatusReg1)?;
        Ok(AgStatus(status).gyro_ready())
    }

    /// Polls the temperature status register for new data.
    pub fn temp_available(&self) -> Result<bool, Error<B::Error>> {
        let status = lock(&self.core).ag_read_byte(AgRegister::StatusReg1)?;
        Ok(AgStatus(status).temp_ready())
    }

    /// Polls the magnetometer status register for new data on one axis, or
    /// on all three axes when `axis` is `None`.
    pub fn mag_available(&self, axis: Option<Axis>) -> Result<bool, Error<B::Error>> {
        let status = MagStatus(lock(&self.core).m_read_byte(MagRegister::StatusRegM)?);
        Ok(match axis {
            Some(Axis::X) => status.x_ready(),
            Some(Axis::Y) => status.y_ready(),
            Some(Axis::Z) => status.z_ready(),
            None => status.zyx_ready(),
        })
    }

    /// Read one axis of the gyroscope as a raw signed 16-bit code.
    pub fn read_gyro(&self, axis: Axis) -> Result<i16, Error<B::Error>> {
        let mut buf = [0u8; 2];
        let start = AgRegister::OutXLG.addr() + axis.reg_offset();
        lock(&self.core).ag_read_block(start, &mut buf)?;
        Ok(combine(buf[0], buf[1]))
    }

    /// Read one axis of the accelerometer as a raw signed 16-bit code.
    pub fn read_accel(&self, axis: Axis) -> Result<i16, Error<B::Error>> {
        let mut buf = [0u8; 2];
        let start = AgRegister::OutXLXl.addr() + axis.reg_offset();
        lock(&self.core).ag_read_block(start, &mut buf)?;
        Ok(combine(buf[0], buf[1]))
    }

    /// Read one axis of the magnetometer as a raw signed 16-bit code.
    pub fn read_mag(&self, axis: Axis) -> Result<i16, Error<B::Error>> {
        let mut buf = [0u8; 2];
        let start = MagRegister::OutXLM.addr() + axis.reg_offset();
        lock(&self.core).m_read_block(start, &mut buf)?;
        Ok(combine(buf[0], buf[1]))
    }

    /// Convert a raw gyroscope code to deg/s using the current resolution.
    pub fn calc_gyro(&self, raw: i16) -> f32 {
        lock(&self.core).g_res * f32::from(raw)
    }

    /// Convert a raw accelerometer code to g using the current resolution.
    pub fn calc_accel(&self, raw: i16) -> f32 {
        lock(&self.core).a_res * f32::from(raw)
    }

    /// Convert a raw magnetometer code to gauss using the current
    /// resolution.
    pub fn calc_mag(&self, raw: i16) -> f32 {
        lock(&self.core).m_res * f32::from(raw)
    }

    // ----------------- Scale and data rate ----------------- //

    /// Set the full-scale range of the gyroscope and recompute its
    /// resolution. Unrelated bits of the control register are preserved.
    pub fn set_gyro_scale(&self, scale: GyroScale) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_gyro_scale(scale)
    }

    /// Set the full-scale range of the accelerometer and recompute its
    /// resolution. Unrelated bits of the control register are preserved.
    pub fn set_accel_scale(&self, scale: AccelScale) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_accel_scale(scale)
    }

    /// Set the full-scale range of the magnetometer and recompute its
    /// resolution. Unrelated bits of the control register are preserved.
    pub fn set_mag_scale(&self, scale: MagScale) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_mag_scale(scale)
    }

    /// Set the output data rate of the gyroscope.
    pub fn set_gyro_odr(&self, rate: GyroSampleRate) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_gyro_odr(rate)
    }

    /// Set the output data rate of the accelerometer.
    pub fn set_accel_odr(&self, rate: AccelSampleRate) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_accel_odr(rate)
    }

    /// Set the output data rate of the magnetometer.
    pub fn set_mag_odr(&self, rate: MagSampleRate) -> Result<(), Error<B::Error>> {
        lock(&self.core).set_mag_odr(rate)
    }

    /// Gyroscope resolution in deg/s per LSB, as last written.
    pub fn gyro_resolution(&self) -> f32 {
        lock(&self.core).g_res
    }

    /// Accelerometer resolution in g per LSB, as last written.
    pub fn accel_resolution(&self) -> f32 {
        lock(&self.core).a_res
    }

    /// Magnetometer resolution in gauss per LSB, as last written.
    pub fn mag_resolution(&self) -> f32 {
        lock(&self.core).m_res
    }

    /// Set the hard-iron offset of one magnetometer axis, in raw units.
    pub fn mag_offset(&self, axis: Axis, offset: i16) -> Result<(), Error<B::Error>> {
        let [low, high] = offset.to_le_bytes();
        let mut core = lock(&self.core);
        core.m_write_raw(MagRegister::OffsetXRegLM.addr() + axis.reg_offset(), low)?;
        core.m_write_raw(MagRegister::OffsetXRegHM.addr() + axis.reg_offset(), high)
    }

    // ----------------- Interrupt generators ----------------- //

    /// Route interrupt generators to the INT1 or INT2 pin and configure
    /// the active level and output driver of both pins.
    ///
    /// `generators` is an OR'd combination from [`int_gen`].
    pub fn config_int(
        &self,
        pin: IntSelect,
        generators: u8,
        level: ActiveLevel,
        mode: PinMode,
    ) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let reg = match pin {
            IntSelect::Int1 => AgRegister::Int1Ctrl,
            IntSelect::Int2 => AgRegister::Int2Ctrl,
        };
        core.ag_write_byte(reg, generators)?;

        let mut value = core.ag_read_byte(AgRegister::CtrlReg8)?;
        match level {
            ActiveLevel::Low => value |= 1 << 5,
            ActiveLevel::High => value &= !(1 << 5),
        }
        match mode {
            PinMode::OpenDrain => value |= 1 << 4,
            PinMode::PushPull => value &= !(1 << 4),
        }
        core.ag_write_byte(AgRegister::CtrlReg8, value)
    }

    /// Configure the inactivity interrupt: `duration` in ODR-dependent
    /// units, `threshold` as a 7-bit activity threshold, and whether the
    /// gyroscope sleeps (rather than powers down) during inactivity.
    pub fn config_inactivity(
        &self,
        duration: u8,
        threshold: u8,
        sleep_on: bool,
    ) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let mut value = threshold & 0x7F;
        if sleep_on {
            value |= 1 << 7;
        }
        core.ag_write_byte(AgRegister::ActThs, value)?;
        core.ag_write_byte(AgRegister::ActDur, duration)
    }

    /// Status of the inactivity interrupt.
    pub fn inactivity(&self) -> Result<bool, Error<B::Error>> {
        let status = lock(&self.core).ag_read_byte(AgRegister::StatusReg0)?;
        Ok(AgStatus(status).inactivity())
    }

    /// Configure the accelerometer interrupt generator. `generators` is an
    /// OR'd combination from [`config::accel_int_gen`]; `and_events`
    /// requires all selected events instead of any.
    ///
    /// [`config::accel_int_gen`]: crate::lsm9ds1::config::accel_int_gen
    pub fn config_accel_int(&self, generators: u8, and_events: bool) -> Result<(), Error<B::Error>> {
        let mut value = generators;
        if and_events {
            value |= 0x80;
        }
        lock(&self.core).ag_write_byte(AgRegister::IntGenCfgXl, value)
    }

    /// Configure the interrupt threshold of one accelerometer axis.
    /// `threshold` is in units of 128 raw counts; `wait` keeps the
    /// interrupt asserted for `duration` samples after the event ends.
    pub fn config_accel_threshold(
        &self,
        threshold: u8,
        axis: Axis,
        duration: u8,
        wait: bool,
    ) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let address = core.device.ag_address;
        core.io.write_byte(
            address,
            AgRegister::IntGenThsXXl.addr() + axis.index(),
            threshold,
        )?;
        let mut value = duration & 0x7F;
        if wait {
            value |= 0x80;
        }
        core.ag_write_byte(AgRegister::IntGenDurXl, value)
    }

    /// Contents of the accelerometer interrupt source register; zero when
    /// no interrupt is active.
    pub fn accel_int_src(&self) -> Result<u8, Error<B::Error>> {
        let src = lock(&self.core).ag_read_byte(AgRegister::IntGenSrcXl)?;
        if src & (1 << 6) != 0 {
            Ok(src & 0x3F)
        } else {
            Ok(0)
        }
    }

    /// Configure the gyroscope interrupt generator. `generators` is an
    /// OR'd combination from [`config::gyro_int_gen`].
    ///
    /// [`config::gyro_int_gen`]: crate::lsm9ds1::config::gyro_int_gen
    pub fn config_gyro_int(
        &self,
        generators: u8,
        and_events: bool,
        latch: bool,
    ) -> Result<(), Error<B::Error>> {
        let mut value = generators;
        if and_events {
            value |= 0x80;
        }
        if latch {
            value |= 0x40;
        }
        lock(&self.core).ag_write_byte(AgRegister::IntGenCfgG, value)
    }

    /// Configure the interrupt threshold of one gyroscope axis, in raw
    /// units (15-bit).
    pub fn config_gyro_threshold(
        &self,
        threshold: i16,
        axis: Axis,
        duration: u8,
        wait: bool,
    ) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let address = core.device.ag_address;
        let base = AgRegister::IntGenThsXHG.addr() + 2 * axis.index();
        core.io
            .write_byte(address, base, ((threshold as u16 & 0x7F00) >> 8) as u8)?;
        core.io.write_byte(address, base + 1, (threshold & 0xFF) as u8)?;
        let mut value = duration & 0x7F;
        if wait {
            value |= 0x80;
        }
        core.ag_write_byte(AgRegister::IntGenDurG, value)
    }

    /// Contents of the gyroscope interrupt source register; zero when no
    /// interrupt is active.
    pub fn gyro_int_src(&self) -> Result<u8, Error<B::Error>> {
        let src = lock(&self.core).ag_read_byte(AgRegister::IntGenSrcG)?;
        if src & (1 << 6) != 0 {
            Ok(src & 0x3F)
        } else {
            Ok(0)
        }
    }

    /// Configure the magnetometer interrupt generator. `generators` is an
    /// OR'd combination from [`config::mag_int_gen`]; the interrupt is
    /// enabled whenever at least one generator is selected.
    ///
    /// [`config::mag_int_gen`]: crate::lsm9ds1::config::mag_int_gen
    pub fn config_mag_int(
        &self,
        generators: u8,
        level: ActiveLevel,
        latch: bool,
    ) -> Result<(), Error<B::Error>> {
        let mut value = generators & 0xE0;
        if level == ActiveLevel::High {
            value |= 1 << 2;
        }
        if !latch {
            value |= 1 << 1;
        }
        if generators != 0 {
            value |= 1 << 0;
        }
        lock(&self.core).m_write_byte(MagRegister::IntCfgM, value)
    }

    /// Configure the magnetometer interrupt threshold, in raw units
    /// (15-bit, applies to all axes).
    pub fn config_mag_threshold(&self, threshold: u16) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        core.m_write_byte(MagRegister::IntThsHM, ((threshold & 0x7F00) >> 8) as u8)?;
        core.m_write_byte(MagRegister::IntThsLM, (threshold & 0xFF) as u8)
    }

    /// Contents of the magnetometer interrupt source register; zero when
    /// no interrupt is active.
    pub fn mag_int_src(&self) -> Result<u8, Error<B::Error>> {
        let src = lock(&self.core).m_read_byte(MagRegister::IntSrcM)?;
        if src & (1 << 0) != 0 {
            Ok(src & 0xFE)
        } else {
            Ok(0)
        }
    }

    // ----------------- Sleep and FIFO ----------------- //

    /// Sleep or wake the gyroscope.
    pub fn sleep_gyro(&self, enable: bool) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let mut value = core.ag_read_byte(AgRegister::CtrlReg9)?;
        if enable {
            value |= 1 << 6;
        } else {
            value &= !(1 << 6);
        }
        core.ag_write_byte(AgRegister::CtrlReg9, value)
    }

    /// Enable or disable the FIFO.
    pub fn enable_fifo(&self, enable: bool) -> Result<(), Error<B::Error>> {
        let mut core = lock(&self.core);
        let mut value = core.ag_read_byte(AgRegister::CtrlReg9)?;
        if enable {
            value |= 1 << 1;
        } else {
            value &= !(1 << 1);
        }
        core.ag_write_byte(AgRegister::CtrlReg9, value)
    }

    /// Configure the FIFO mode and threshold. Thresholds above 31 are
    /// clamped to 31.
    pub fn set_fifo(&self, mode: FifoMode, threshold: u8) -> Result<(), Error<B::Error>> {
        let threshold = threshold.min(0x1F);
        lock(&self.core).ag_write_byte(AgRegister::FifoCtrl, mode.bits() << 5 | threshold)
    }

    /// Decoded FIFO_SRC register: threshold/overrun flags and the number
    /// of unread samples.
    pub fn fifo_status(&self) -> Result<FifoSource, Error<B::Error>> {
        let src = lock(&self.core).ag_read_byte(AgRegister::FifoSrc)?;
        Ok(FifoSource(src))
    }

    /// Number of unread samples in the FIFO.
    pub fn fifo_samples(&self) -> Result<u8, Error<B::Error>> {
        Ok(self.fifo_status()?.samples())
    }
}

impl<B, S> Drop for Lsm9ds1<B, S>
where
    B: I2cBus,
    S: EdgeSource,
{
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Body of the acquisition thread: block on the data-ready edge with a
/// bounded timeout, re-checking the stop flag on every timeout; on each
/// edge run one sampling pass and deliver the sample.
fn acquisition_loop<B, V>(
    mut events: V,
    core: Arc<Mutex<Core<B>>>,
    handler: Handler,
    running: Arc<AtomicBool>,
) where
    B: I2cBus,
    B::Error: fmt::Debug,
    V: EdgeEvents,
{
    while running.load(Ordering::SeqCst) {
        match events.wait(EDGE_WAIT_TIMEOUT) {
            Ok(EdgeWait::TimedOut) => continue,
            Ok(EdgeWait::Edge) => data_ready(&core, &handler),
            Err(e) => {
                error!("data-ready wait failed, stopping acquisition: {}", e);
                break;
            }
        }
    }
}

/// One data-ready event. The edge is already consumed by the wait; with no
/// subscriber there is nothing further to do and no bus read happens.
fn data_ready<B>(core: &Arc<Mutex<Core<B>>>, handler: &Handler)
where
    B: I2cBus,
    B::Error: fmt::Debug,
{
    let mut guard = lock(handler);
    let callback = match guard.as_mut() {
        Some(callback) => callback,
        None => return,
    };

    let sample = lock(core).sample_pass();
    match sample {
        Ok(sample) => {
            // A panicking subscriber must not take the acquisition thread
            // down; the next edge is still served.
            if catch_unwind(AssertUnwindSafe(|| callback.on_sample(sample))).is_err() {
                error!("sample callback panicked");
            }
        }
        Err(e) => error!("sampling pass failed: {}", e),
    }
}
