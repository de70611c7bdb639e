// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Read-side register bitfields.

use bitfield::bitfield;

bitfield! {
    /// bitfields of the accelerometer/gyroscope STATUS_REG
    pub struct AgStatus(u8);
    impl Debug;
    /// inactivity interrupt asserted
    pub inactivity, _: 4;
    /// boot is running
    pub boot_status, _: 3;
    /// new temperature data available
    pub temp_ready, _: 2;
    /// new gyroscope data available
    pub gyro_ready, _: 1;
    /// new accelerometer data available
    pub accel_ready, _: 0;
}

bitfield! {
    /// bitfields of the magnetometer STATUS_REG_M
    pub struct MagStatus(u8);
    impl Debug;
    /// x/y/z axis data overrun
    pub zyx_overrun, _: 7;
    /// new data available on all three axes
    pub zyx_ready, _: 3;
    /// new z axis data available
    pub z_ready, _: 2;
    /// new y axis data available
    pub y_ready, _: 1;
    /// new x axis data available
    pub x_ready, _: 0;
}

bitfield! {
    /// bitfields of the FIFO_SRC register
    pub struct FifoSource(u8);
    impl Debug;
    /// FIFO threshold reached
    pub threshold_reached, _: 7;
    /// FIFO overrun
    pub overrun, _: 6;
    /// number of unread samples in the FIFO
    pub u8, samples, _: 5, 0;
}
