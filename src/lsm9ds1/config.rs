// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Configuration surface of the three sub-sensors plus the temperature
//! channel, and the pure encoding of those settings into control-register
//! bytes.
//!
//! Scale and rate enums carry their register bit patterns. Decoding is
//! deliberately permissive: a bit pattern with no mapping decodes to the
//! same default the hardware itself falls back to, never an error.
//!
//! Resolutions (physical units per LSB) derive from the scale selection:
//! linear `scale / 32768` for gyroscope and accelerometer, a fixed
//! four-entry sensitivity table for the magnetometer.

use strum::EnumIter;

/// Gyroscope full-scale range in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum GyroScale {
    /// 245 dps
    Dps245,
    /// 500 dps
    Dps500,
    /// 2000 dps
    Dps2000,
}

impl GyroScale {
    /// Full-scale magnitude in dps.
    pub fn dps(self) -> f32 {
        match self {
            GyroScale::Dps245 => 245.0,
            GyroScale::Dps500 => 500.0,
            GyroScale::Dps2000 => 2000.0,
        }
    }

    /// FS_G bit pattern (CTRL_REG1_G bits 4:3).
    pub fn bits(self) -> u8 {
        match self {
            GyroScale::Dps245 => 0b00,
            GyroScale::Dps500 => 0b01,
            GyroScale::Dps2000 => 0b11,
        }
    }

    /// Decode an FS_G bit pattern. The unmapped pattern `0b10` selects
    /// 245 dps, matching the hardware default.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => GyroScale::Dps500,
            0b11 => GyroScale::Dps2000,
            _ => GyroScale::Dps245,
        }
    }

    /// Rotation in dps represented by one LSB of the raw code.
    pub fn resolution(self) -> f32 {
        self.dps() / 32768.0
    }
}

/// Gyroscope output data rate. While the gyroscope is enabled this also
/// paces the accelerometer and the data-ready interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum GyroSampleRate {
    /// 14.9 Hz
    Hz14_9,
    /// 59.5 Hz
    Hz59_5,
    /// 119 Hz
    Hz119,
    /// 238 Hz
    Hz238,
    /// 476 Hz
    Hz476,
    /// 952 Hz
    Hz952,
}

impl GyroSampleRate {
    /// ODR_G bit pattern (CTRL_REG1_G bits 7:5).
    pub fn bits(self) -> u8 {
        match self {
            GyroSampleRate::Hz14_9 => 1,
            GyroSampleRate::Hz59_5 => 2,
            GyroSampleRate::Hz119 => 3,
            GyroSampleRate::Hz238 => 4,
            GyroSampleRate::Hz476 => 5,
            GyroSampleRate::Hz952 => 6,
        }
    }

    /// Decode an ODR_G bit pattern. `0` would power the gyroscope down and
    /// `7` is reserved; both decode to 14.9 Hz.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            2 => GyroSampleRate::Hz59_5,
            3 => GyroSampleRate::Hz119,
            4 => GyroSampleRate::Hz238,
            5 => GyroSampleRate::Hz476,
            6 => GyroSampleRate::Hz952,
            _ => GyroSampleRate::Hz14_9,
        }
    }
}

/// Gyroscope settings with default values.
#[derive(Debug, Clone, Copy)]
pub struct GyroSettings {
    /// Full-scale range, 245/500/2000 dps.
    pub scale: GyroScale,
    /// Output data rate.
    pub sample_rate: GyroSampleRate,
    /// X axis output enabled.
    pub enable_x: bool,
    /// Y axis output enabled.
    pub enable_y: bool,
    /// Z axis output enabled.
    pub enable_z: bool,
    /// Bandwidth selection, 0-3. Cutoff depends on the ODR.
    pub bandwidth: u8,
    /// Low-power mode.
    pub low_power_enable: bool,
    /// High-pass filter enabled.
    pub hpf_enable: bool,
    /// High-pass filter cutoff selection, 0-15. Cutoff depends on the ODR.
    pub hpf_cutoff: u8,
    /// Negate the X (pitch) angular rate.
    pub flip_x: bool,
    /// Negate the Y (roll) angular rate.
    pub flip_y: bool,
    /// Negate the Z (yaw) angular rate.
    pub flip_z: bool,
    /// Latch the interrupt request.
    pub latch_interrupt: bool,
}

impl Default for GyroSettings {
    fn default() -> Self {
        GyroSettings {
            scale: GyroScale::Dps245,
            sample_rate: GyroSampleRate::Hz14_9,
            enable_x: true,
            enable_y: true,
            enable_z: true,
            bandwidth: 0,
            low_power_enable: false,
            hpf_enable: false,
            hpf_cutoff: 0,
            flip_x: false,
            flip_y: false,
            flip_z: false,
            latch_interrupt: true,
        }
    }
}

impl GyroSettings {
    /// CTRL_REG1_G: [ODR_G2:0][FS_G1:0][0][BW_G1:0]
    pub fn ctrl_reg1(&self) -> u8 {
        (self.sample_rate.bits() & 0x07) << 5 | self.scale.bits() << 3 | (self.bandwidth & 0x03)
    }

    /// CTRL_REG3_G: [LP_mode][HP_EN][0][0][HPCF_G3:0]
    pub fn ctrl_reg3(&self) -> u8 {
        let mut value = if self.low_power_enable { 1 << 7 } else { 0 };
        if self.hpf_enable {
            value |= (1 << 6) | (self.hpf_cutoff & 0x0F);
        }
        value
    }

    /// CTRL_REG4: [0][0][Zen_G][Yen_G][Xen_G][0][LIR_XL1][4D_XL1]
    pub fn ctrl_reg4(&self) -> u8 {
        let mut value = 0;
        if self.enable_z {
            value |= 1 << 5;
        }
        if self.enable_y {
            value |= 1 << 4;
        }
        if self.enable_x {
            value |= 1 << 3;
        }
        if self.latch_interrupt {
            value |= 1 << 1;
        }
        value
    }

    /// ORIENT_CFG_G: [0][0][SignX_G][SignY_G][SignZ_G][Orient2:0]
    pub fn orient_cfg(&self) -> u8 {
        let mut value = 0;
        if self.flip_x {
            value |= 1 << 5;
        }
        if self.flip_y {
            value |= 1 << 4;
        }
        if self.flip_z {
            value |= 1 << 3;
        }
        value
    }
}

/// Accelerometer full-scale range in g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum AccelScale {
    /// 2 g
    G2,
    /// 4 g
    G4,
    /// 8 g
    G8,
    /// 16 g
    G16,
}

impl AccelScale {
    /// Full-scale magnitude in g.
    pub fn g(self) -> f32 {
        match self {
            AccelScale::G2 => 2.0,
            AccelScale::G4 => 4.0,
            AccelScale::G8 => 8.0,
            AccelScale::G16 => 16.0,
        }
    }

    /// FS_XL bit pattern (CTRL_REG6_XL bits 4:3). Note the hardware orders
    /// these 2g, 16g, 4g, 8g.
    pub fn bits(self) -> u8 {
        match self {
            AccelScale::G2 => 0b00,
            AccelScale::G16 => 0b01,
            AccelScale::G4 => 0b10,
            AccelScale::G8 => 0b11,
        }
    }

    /// Decode an FS_XL bit pattern; all four patterns are mapped.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => AccelScale::G16,
            0b10 => AccelScale::G4,
            0b11 => AccelScale::G8,
            _ => AccelScale::G2,
        }
    }

    /// Acceleration in g represented by one LSB of the raw code.
    pub fn resolution(self) -> f32 {
        self.g() / 32768.0
    }
}

/// Accelerometer output data rate, used when the gyroscope is powered down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum AccelSampleRate {
    /// 10 Hz
    Hz10,
    /// 50 Hz
    Hz50,
    /// 119 Hz
    Hz119,
    /// 238 Hz
    Hz238,
    /// 476 Hz
    Hz476,
    /// 952 Hz
    Hz952,
}

impl AccelSampleRate {
    /// ODR_XL bit pattern (CTRL_REG6_XL bits 7:5).
    pub fn bits(self) -> u8 {
        match self {
            AccelSampleRate::Hz10 => 1,
            AccelSampleRate::Hz50 => 2,
            AccelSampleRate::Hz119 => 3,
            AccelSampleRate::Hz238 => 4,
            AccelSampleRate::Hz476 => 5,
            AccelSampleRate::Hz952 => 6,
        }
    }

    /// Decode an ODR_XL bit pattern. `0` would power the accelerometer
    /// down and `7` is reserved; both decode to 10 Hz.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            2 => AccelSampleRate::Hz50,
            3 => AccelSampleRate::Hz119,
            4 => AccelSampleRate::Hz238,
            5 => AccelSampleRate::Hz476,
            6 => AccelSampleRate::Hz952,
            _ => AccelSampleRate::Hz10,
        }
    }
}

/// Anti-aliasing filter bandwidth of the accelerometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum AccelBandwidth {
    /// 408 Hz
    Hz408,
    /// 211 Hz
    Hz211,
    /// 105 Hz
    Hz105,
    /// 50 Hz
    Hz50,
}

impl AccelBandwidth {
    /// BW_XL bit pattern (CTRL_REG6_XL bits 1:0).
    pub fn bits(self) -> u8 {
        match self {
            AccelBandwidth::Hz408 => 0b00,
            AccelBandwidth::Hz211 => 0b01,
            AccelBandwidth::Hz105 => 0b10,
            AccelBandwidth::Hz50 => 0b11,
        }
    }
}

/// Accelerometer settings with default values.
#[derive(Debug, Clone, Copy)]
pub struct AccelSettings {
    /// Full-scale range, 2/4/8/16 g.
    pub scale: AccelScale,
    /// Output data rate while the gyroscope is powered down.
    pub sample_rate: AccelSampleRate,
    /// X axis output enabled.
    pub enable_x: bool,
    /// Y axis output enabled.
    pub enable_y: bool,
    /// Z axis output enabled.
    pub enable_z: bool,
    /// Anti-aliasing filter bandwidth; `None` leaves the cutoff to the ODR.
    pub bandwidth: Option<AccelBandwidth>,
    /// High resolution mode.
    pub high_res_enable: bool,
    /// Digital filter cutoff selection in high resolution mode, 0-3.
    pub high_res_bandwidth: u8,
}

impl Default for AccelSettings {
    fn default() -> Self {
        AccelSettings {
            scale: AccelScale::G16,
            sample_rate: AccelSampleRate::Hz10,
            enable_x: true,
            enable_y: true,
            enable_z: true,
            bandwidth: None,
            high_res_enable: false,
            high_res_bandwidth: 0,
        }
    }
}

impl AccelSettings {
    /// CTRL_REG5_XL: [DEC1:0][Zen_XL][Yen_XL][Xen_XL][0][0][0]
    ///
    /// Decimation bits are left at zero.
    pub fn ctrl_reg5(&self) -> u8 {
        let mut value = 0;
        if self.enable_z {
            value |= 1 << 5;
        }
        if self.enable_y {
            value |= 1 << 4;
        }
        if self.enable_x {
            value |= 1 << 3;
        }
        value
    }

    /// CTRL_REG6_XL: [ODR_XL2:0][FS_XL1:0][BW_SCAL_ODR][BW_XL1:0]
    pub fn ctrl_reg6(&self) -> u8 {
        let mut value = (self.sample_rate.bits() & 0x07) << 5 | self.scale.bits() << 3;
        if let Some(bw) = self.bandwidth {
            value |= (1 << 2) | bw.bits();
        }
        value
    }

    /// CTRL_REG7_XL: [HR][DCF1:0][0][0][FDS][0][HPIS1]
    pub fn ctrl_reg7(&self) -> u8 {
        let mut value = 0;
        if self.high_res_enable {
            value |= 1 << 7;
            value |= (self.high_res_bandwidth & 0x03) << 5;
        }
        value
    }
}

/// Magnetometer full-scale range in gauss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum MagScale {
    /// 4 gauss
    Gs4,
    /// 8 gauss
    Gs8,
    /// 12 gauss
    Gs12,
    /// 16 gauss
    Gs16,
}

impl MagScale {
    /// Full-scale magnitude in gauss.
    pub fn gauss(self) -> f32 {
        match self {
            MagScale::Gs4 => 4.0,
            MagScale::Gs8 => 8.0,
            MagScale::Gs12 => 12.0,
            MagScale::Gs16 => 16.0,
        }
    }

    /// FS bit pattern (CTRL_REG2_M bits 6:5).
    pub fn bits(self) -> u8 {
        match self {
            MagScale::Gs4 => 0b00,
            MagScale::Gs8 => 0b01,
            MagScale::Gs12 => 0b10,
            MagScale::Gs16 => 0b11,
        }
    }

    /// Decode an FS bit pattern; all four patterns are mapped.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => MagScale::Gs8,
            0b10 => MagScale::Gs12,
            0b11 => MagScale::Gs16,
            _ => MagScale::Gs4,
        }
    }

    /// Magnetic field in gauss represented by one LSB of the raw code.
    ///
    /// Unlike the other two sensors this is not linear in the scale; the
    /// values come from the data sheet sensitivity table.
    pub fn resolution(self) -> f32 {
        match self {
            MagScale::Gs4 => 0.00014,
            MagScale::Gs8 => 0.00029,
            MagScale::Gs12 => 0.00043,
            MagScale::Gs16 => 0.00058,
        }
    }
}

/// Magnetometer output data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum MagSampleRate {
    /// 0.625 Hz
    Hz0_625,
    /// 1.25 Hz
    Hz1_25,
    /// 2.5 Hz
    Hz2_5,
    /// 5 Hz
    Hz5,
    /// 10 Hz
    Hz10,
    /// 20 Hz
    Hz20,
    /// 40 Hz
    Hz40,
    /// 80 Hz
    Hz80,
}

impl MagSampleRate {
    /// DO bit pattern (CTRL_REG1_M bits 4:2).
    pub fn bits(self) -> u8 {
        match self {
            MagSampleRate::Hz0_625 => 0,
            MagSampleRate::Hz1_25 => 1,
            MagSampleRate::Hz2_5 => 2,
            MagSampleRate::Hz5 => 3,
            MagSampleRate::Hz10 => 4,
            MagSampleRate::Hz20 => 5,
            MagSampleRate::Hz40 => 6,
            MagSampleRate::Hz80 => 7,
        }
    }

    /// Decode a DO bit pattern; all eight patterns are mapped.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => MagSampleRate::Hz0_625,
            1 => MagSampleRate::Hz1_25,
            2 => MagSampleRate::Hz2_5,
            3 => MagSampleRate::Hz5,
            4 => MagSampleRate::Hz10,
            5 => MagSampleRate::Hz20,
            6 => MagSampleRate::Hz40,
            _ => MagSampleRate::Hz80,
        }
    }
}

/// Magnetometer settings with default values.
#[derive(Debug, Clone, Copy)]
pub struct MagSettings {
    /// When false the acquisition pass skips the magnetometer entirely.
    pub enabled: bool,
    /// Full-scale range, 4/8/12/16 gauss.
    pub scale: MagScale,
    /// Output data rate.
    pub sample_rate: MagSampleRate,
    /// Temperature compensation.
    pub temp_compensation_enable: bool,
    /// X/Y axes operative mode, 0 (low power) to 3 (ultra-high performance).
    pub xy_performance: u8,
    /// Z axis operative mode, 0 (low power) to 3 (ultra-high performance).
    pub z_performance: u8,
    /// Low-power mode.
    pub low_power_enable: bool,
}

impl Default for MagSettings {
    fn default() -> Self {
        MagSettings {
            enabled: true,
            scale: MagScale::Gs16,
            sample_rate: MagSampleRate::Hz80,
            temp_compensation_enable: false,
            xy_performance: 3,
            z_performance: 3,
            low_power_enable: false,
        }
    }
}

impl MagSettings {
    /// CTRL_REG1_M: [TEMP_COMP][OM1:0][DO2:0][0][ST]
    pub fn ctrl_reg1(&self) -> u8 {
        let mut value = 0;
        if self.temp_compensation_enable {
            value |= 1 << 7;
        }
        value |= (self.xy_performance & 0x03) << 5;
        value |= (self.sample_rate.bits() & 0x07) << 2;
        value
    }

    /// CTRL_REG2_M: [0][FS1:0][0][REBOOT][SOFT_RST][0][0]
    pub fn ctrl_reg2(&self) -> u8 {
        self.scale.bits() << 5
    }

    /// CTRL_REG3_M: [I2C_DISABLE][0][LP][0][0][SIM][MD1:0]
    ///
    /// Operating mode is fixed to continuous conversion.
    pub fn ctrl_reg3(&self) -> u8 {
        if self.low_power_enable {
            1 << 5
        } else {
            0
        }
    }

    /// CTRL_REG4_M: [0][0][0][0][OMZ1:0][BLE][0]
    pub fn ctrl_reg4(&self) -> u8 {
        (self.z_performance & 0x03) << 2
    }

    /// CTRL_REG5_M: [0][BDU][0][0][0][0][0][0]; continuous update.
    pub fn ctrl_reg5(&self) -> u8 {
        0
    }
}

/// Temperature sensor settings.
#[derive(Debug, Clone, Copy)]
pub struct TempSettings {
    /// When false the acquisition pass skips the temperature registers.
    pub enabled: bool,
}

impl Default for TempSettings {
    fn default() -> Self {
        TempSettings { enabled: true }
    }
}

/// Convert a raw temperature code to degrees Celsius with one decimal of
/// resolution. A code of 0 reads as 25.0 degrees, 16 LSB per degree.
pub fn temp_to_celsius(code: i16) -> f32 {
    ((f32::from(code) / 16.0 + 25.0) * 10.0).round() / 10.0
}

/// INT1/INT2 pin selection for [`config_int`](super::Lsm9ds1::config_int).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntSelect {
    /// The INT1_A/G pin.
    Int1,
    /// The INT2_A/G pin.
    Int2,
}

/// Interrupt active level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLevel {
    /// Interrupt lines are active-high.
    High,
    /// Interrupt lines are active-low.
    Low,
}

/// Interrupt pin output driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output.
    PushPull,
    /// Open-drain output.
    OpenDrain,
}

/// FIFO operating mode (FIFO_CTRL bits 7:5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    /// FIFO off (bypass).
    Off,
    /// Stop collecting when the threshold is reached.
    Threshold,
    /// Continuous until trigger, then FIFO.
    ContinuousTrigger,
    /// Bypass until trigger, then continuous.
    OffTrigger,
    /// Continuous; the oldest sample is overwritten when full.
    Continuous,
}

impl FifoMode {
    pub(crate) fn bits(self) -> u8 {
        match self {
            FifoMode::Off => 0,
            FifoMode::Threshold => 1,
            FifoMode::ContinuousTrigger => 3,
            FifoMode::OffTrigger => 4,
            FifoMode::Continuous => 5,
        }
    }
}

/// OR-able interrupt generator selections for the INT1/INT2 pins.
pub mod int_gen {
    /// Accelerometer data ready (INT1 and INT2).
    pub const DRDY_XL: u8 = 1 << 0;
    /// Gyroscope data ready (INT1 and INT2).
    pub const DRDY_G: u8 = 1 << 1;
    /// Boot status (INT1 only).
    pub const BOOT: u8 = 1 << 2;
    /// Temperature data ready (INT2 only).
    pub const DRDY_TEMP: u8 = 1 << 2;
    /// FIFO threshold (INT1 and INT2).
    pub const FTH: u8 = 1 << 3;
    /// FIFO overrun (INT1 and INT2).
    pub const OVR: u8 = 1 << 4;
    /// FIFO full (INT1 and INT2).
    pub const FSS5: u8 = 1 << 5;
    /// Accelerometer interrupt generator (INT1 only).
    pub const IG_XL: u8 = 1 << 6;
    /// Gyroscope interrupt generator (INT1 only).
    pub const IG_G: u8 = 1 << 7;
    /// Inactivity interrupt (INT2 only).
    pub const INACT: u8 = 1 << 7;
}

/// OR-able accelerometer interrupt generator events (INT_GEN_CFG_XL).
pub mod accel_int_gen {
    /// X low event.
    pub const XLIE: u8 = 1 << 0;
    /// X high event.
    pub const XHIE: u8 = 1 << 1;
    /// Y low event.
    pub const YLIE: u8 = 1 << 2;
    /// Y high event.
    pub const YHIE: u8 = 1 << 3;
    /// Z low event.
    pub const ZLIE: u8 = 1 << 4;
    /// Z high event.
    pub const ZHIE: u8 = 1 << 5;
    /// 6-direction detection.
    pub const GEN_6D: u8 = 1 << 6;
}

/// OR-able gyroscope interrupt generator events (INT_GEN_CFG_G).
pub mod gyro_int_gen {
    /// X low event.
    pub const XLIE: u8 = 1 << 0;
    /// X high event.
    pub const XHIE: u8 = 1 << 1;
    /// Y low event.
    pub const YLIE: u8 = 1 << 2;
    /// Y high event.
    pub const YHIE: u8 = 1 << 3;
    /// Z low event.
    pub const ZLIE: u8 = 1 << 4;
    /// Z high event.
    pub const ZHIE: u8 = 1 << 5;
}

/// OR-able magnetometer interrupt generator events (INT_CFG_M).
pub mod mag_int_gen {
    /// Z axis event.
    pub const ZIEN: u8 = 1 << 5;
    /// Y axis event.
    pub const YIEN: u8 = 1 << 6;
    /// X axis event.
    pub const XIEN: u8 = 1 << 7;
}
