// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Driver for the ST LSM9DS1 9-axis IMU (gyroscope, accelerometer, magnetometer).
//!
//! The LSM9DS1 exposes two peripherals on the same I2C bus: the combined
//! accelerometer/gyroscope and the magnetometer. This driver programs all
//! three sub-sensors plus the on-chip temperature channel, and runs an
//! interrupt-driven acquisition loop: a background thread blocks on the
//! data-ready GPIO edge, burst-reads the output registers and delivers one
//! [`Sample`](lsm9ds1::Sample) in physical units to a registered callback
//! per event.
//!
//! The bus and the data-ready line are abstracted behind the
//! [`I2cBus`](lsm9ds1::transport::I2cBus) and
//! [`EdgeSource`](lsm9ds1::interrupt::EdgeSource) traits, so the driver is
//! independent of the actual transport (Linux i2c-dev plus gpiod on a
//! Raspberry Pi being the usual pairing) and fully testable against mocks.
//!
//! The data sheet for this device can be found
//! [here](https://www.st.com/resource/en/datasheet/lsm9ds1.pdf).
//!
//! In the simplest case, register a callback, call
//! [`begin`](lsm9ds1::Lsm9ds1::begin) with default settings and call
//! [`end`](lsm9ds1::Lsm9ds1::end) (or just drop the driver) to stop.

#![deny(missing_docs)]

/// Main module holding the driver, its configuration surface and the
/// collaborator traits for the bus and the data-ready line.
pub mod lsm9ds1;
