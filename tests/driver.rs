// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Integration tests running the full driver against an in-memory bus and
//! a channel-backed data-ready line.

mod common;

use std::sync::mpsc::Sender;
use std::time::Duration;

use lsm9ds1_driver::lsm9ds1::config::{
    int_gen, mag_int_gen, AccelScale, AccelSettings, ActiveLevel, FifoMode, GyroSampleRate,
    GyroScale, GyroSettings, IntSelect, MagSampleRate, MagScale, MagSettings, PinMode,
    TempSettings,
};
use lsm9ds1_driver::lsm9ds1::{Axis, DeviceSettings, Error, Lsm9ds1};

use common::{edge_pair, MockBus, MockEdgeSource, PanicThenRecord, Recorder, AG, MAG};

const RECV: Duration = Duration::from_secs(2);
const NO_RECV: Duration = Duration::from_millis(200);

fn driver(bus: &MockBus) -> (Lsm9ds1<MockBus, MockEdgeSource>, Sender<()>) {
    common::init_logs();
    let (tx, source) = edge_pair();
    (
        Lsm9ds1::new(DeviceSettings::default(), bus.clone(), source),
        tx,
    )
}

#[test]
fn rejects_unknown_device_before_any_write() {
    let bus = MockBus::new();
    bus.set(AG, 0x0F, 0x00);
    let (mut imu, _tx) = driver(&bus);

    match imu.begin_with_defaults() {
        Err(Error::UnknownDevice(id)) => assert_eq!(id, 0x003D),
        other => panic!("expected UnknownDevice, got {:?}", other),
    }
    assert_eq!(bus.write_count(), 0);
    assert!(!imu.is_running());
}

#[test]
fn begin_can_be_retried_after_failed_bring_up() {
    let bus = MockBus::new();
    bus.set(AG, 0x0F, 0x00);
    let (mut imu, tx) = driver(&bus);

    match imu.begin_with_defaults() {
        Err(Error::UnknownDevice(_)) => {}
        other => panic!("expected UnknownDevice, got {:?}", other),
    }

    // The device shows up; the same instance starts normally.
    bus.set(AG, 0x0F, 0x68);
    imu.begin_with_defaults().unwrap();
    assert!(imu.is_running());

    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();

    imu.end();
}

#[test]
fn bring_up_writes_full_register_bytes() {
    let bus = MockBus::new();
    let (mut imu, _tx) = driver(&bus);
    imu.begin_with_defaults().unwrap();

    // Gyroscope: 14.9 Hz, 245 dps, interrupt latched, INT2 armed for
    // accelerometer data-ready.
    assert_eq!(bus.reg(AG, 0x10), 0x20);
    assert_eq!(bus.reg(AG, 0x11), 0x00);
    assert_eq!(bus.reg(AG, 0x12), 0x00);
    assert_eq!(bus.reg(AG, 0x13), 0x00);
    assert_eq!(bus.reg(AG, 0x1E), 0x3A);
    assert_eq!(bus.reg(AG, 0x0D), int_gen::DRDY_XL);
    // Accelerometer: all axes, 10 Hz, 16 g.
    assert_eq!(bus.reg(AG, 0x1F), 0x38);
    assert_eq!(bus.reg(AG, 0x20), 0x28);
    assert_eq!(bus.reg(AG, 0x21), 0x00);
    // Magnetometer: ultra-high performance x/y/z, 80 Hz, continuous.
    assert_eq!(bus.reg(MAG, 0x20), 0x7C);
    assert_eq!(bus.reg(MAG, 0x21), 0x60);
    assert_eq!(bus.reg(MAG, 0x22), 0x00);
    assert_eq!(bus.reg(MAG, 0x23), 0x0C);
    assert_eq!(bus.reg(MAG, 0x24), 0x00);

    imu.end();
}

#[test]
fn delivers_one_sample_per_edge_in_physical_units() {
    let bus = MockBus::new();
    bus.set_word(AG, 0x18, 16384);
    bus.set_word(AG, 0x1A, 0);
    bus.set_word(AG, 0x1C, -16384);
    bus.set_word(AG, 0x28, -16384);
    bus.set_word(MAG, 0x28, 10000);
    bus.set_word(AG, 0x15, 160);

    let (mut imu, tx) = driver(&bus);
    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    imu.begin(
        GyroSettings {
            scale: GyroScale::Dps500,
            ..GyroSettings::default()
        },
        AccelSettings {
            scale: AccelScale::G4,
            ..AccelSettings::default()
        },
        MagSettings {
            scale: MagScale::Gs8,
            ..MagSettings::default()
        },
        TempSettings::default(),
    )
    .unwrap();

    tx.send(()).unwrap();
    let sample = samples.recv_timeout(RECV).unwrap();
    assert_eq!(sample.gx, 250.0);
    assert_eq!(sample.gy, 0.0);
    assert_eq!(sample.gz, -250.0);
    assert_eq!(sample.ax, -2.0);
    assert!((sample.mx - 2.9).abs() < 1e-3);
    assert_eq!(sample.my, 0.0);
    assert_eq!(sample.temperature, 35.0);

    // Exactly one callback per edge.
    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();
    assert!(samples.recv_timeout(NO_RECV).is_err());

    imu.end();
}

#[test]
fn gyro_and_accel_faults_substitute_sentinels() {
    let bus = MockBus::new();
    bus.fail_reads_at(AG, 0x18);
    bus.short_reads_at(AG, 0x28, 2);
    bus.set_word(MAG, 0x28, 1000);
    bus.set_word(AG, 0x15, 0);

    let (mut imu, tx) = driver(&bus);
    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    imu.begin_with_defaults().unwrap();

    tx.send(()).unwrap();
    let sample = samples.recv_timeout(RECV).unwrap();
    // Raw fault codes 9999/999 scaled through the active resolutions.
    assert_eq!(sample.gx, 245.0 / 32768.0 * 9999.0);
    assert_eq!(sample.gy, sample.gx);
    assert_eq!(sample.gz, sample.gx);
    assert_eq!(sample.ax, 16.0 / 32768.0 * 999.0);
    assert_eq!(sample.ay, sample.ax);
    assert_eq!(sample.az, sample.ax);
    // Magnetometer and temperature still read normally (16 gauss default).
    assert!((sample.mx - 0.00058 * 1000.0).abs() < 1e-4);
    assert_eq!(sample.temperature, 25.0);

    // The pass keeps going; later edges still deliver.
    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();

    imu.end();
}

#[test]
fn mag_fault_drops_the_sample_but_not_the_worker() {
    let bus = MockBus::new();
    bus.fail_reads_at(MAG, 0x28);

    let (mut imu, tx) = driver(&bus);
    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    imu.begin_with_defaults().unwrap();

    tx.send(()).unwrap();
    assert!(samples.recv_timeout(NO_RECV).is_err());

    bus.restore_reads_at(MAG, 0x28);
    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();

    imu.end();
}

#[test]
fn end_stops_callbacks_and_is_idempotent() {
    let bus = MockBus::new();
    let (mut imu, tx) = driver(&bus);
    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    imu.begin_with_defaults().unwrap();

    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();

    imu.end();
    assert!(!imu.is_running());
    imu.end();

    let _ = tx.send(());
    assert!(samples.recv_timeout(NO_RECV).is_err());
}

#[test]
fn edges_without_subscriber_cause_no_bus_reads() {
    let bus = MockBus::new();
    let (mut imu, tx) = driver(&bus);
    imu.begin_with_defaults().unwrap();
    let reads_after_begin = bus.read_count();

    // Edge with no handler registered: consumed, but nothing touches the
    // bus. Give the worker time to drain it before a handler shows up.
    tx.send(()).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(bus.read_count(), reads_after_begin);

    let (recorder, samples) = Recorder::channel();
    imu.set_handler(recorder);
    tx.send(()).unwrap();
    samples.recv_timeout(RECV).unwrap();

    // One sampling pass is four burst reads (gyro, accel, mag, temp); the
    // handler-less edge contributed none.
    assert_eq!(bus.read_count(), reads_after_begin + 4);

    imu.end();
}

#[test]
fn scale_mutation_preserves_unrelated_bits() {
    let bus = MockBus::new();
    let (imu, _tx) = driver(&bus);

    bus.set(AG, 0x10, 0x65);
    imu.set_gyro_scale(GyroScale::Dps500).unwrap();
    assert_eq!(bus.reg(AG, 0x10), 0x6D);
    assert_eq!(imu.gyro_resolution(), 500.0 / 32768.0);

    bus.set(AG, 0x20, 0xE7);
    imu.set_accel_scale(AccelScale::G4).unwrap();
    assert_eq!(bus.reg(AG, 0x20), 0xF7);
    assert_eq!(imu.accel_resolution(), 4.0 / 32768.0);

    bus.set(MAG, 0x21, 0x60);
    imu.set_mag_scale(MagScale::Gs12).unwrap();
    assert_eq!(bus.reg(MAG, 0x21), 0x40);
    assert_eq!(imu.mag_resolution(), 0.00043);
}

#[test]
fn odr_mutation_preserves_scale_bits() {
    let bus = MockBus::new();
    let (imu, _tx) = driver(&bus);

    bus.set(AG, 0x10, 0x38);
    imu.set_gyro_odr(GyroSampleRate::Hz952).unwrap();
    assert_eq!(bus.reg(AG, 0x10), 0xD8);

    bus.set(MAG, 0x20, 0x7C);
    imu.set_mag_odr(MagSampleRate::Hz10).unwrap();
    assert_eq!(bus.reg(MAG, 0x20), 0x70);
}

#[test]
fn callback_panic_does_not_kill_acquisition() {
    let bus = MockBus::new();
    let (mut imu, tx) = driver(&bus);
    let (handler, samples) = PanicThenRecord::channel();
    imu.set_handler(handler);
    imu.begin_with_defaults().unwrap();

    tx.send(()).unwrap();
    tx.send(()).unwrap();
    // First invocation panics inside the worker; second one records.
    samples.recv_timeout(RECV).unwrap();

    imu.end();
}

#[test]
fn begin_twice_is_rejected() {
    let bus = MockBus::new();
    let (mut imu, _tx) = driver(&bus);
    imu.begin_with_defaults().unwrap();

    match imu.begin_with_defaults() {
        Err(Error::AlreadyRunning) => {}
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }

    imu.end();
}

#[test]
fn polling_reads_status_and_single_axes() {
    let bus = MockBus::new();
    let (imu, _tx) = driver(&bus);

    bus.set(AG, 0x27, 0b0000_0011);
    assert!(imu.accel_available().unwrap());
    assert!(imu.gyro_available().unwrap());
    assert!(!imu.temp_available().unwrap());

    bus.set(MAG, 0x27, 0b0000_0100);
    assert!(imu.mag_available(Some(Axis::Z)).unwrap());
    assert!(!imu.mag_available(Some(Axis::X)).unwrap());
    assert!(!imu.mag_available(None).unwrap());

    bus.set_word(AG, 0x1A, -5000);
    assert_eq!(imu.read_gyro(Axis::Y).unwrap(), -5000);
    bus.set_word(MAG, 0x2C, 1234);
    assert_eq!(imu.read_mag(Axis::Z).unwrap(), 1234);
    bus.set_word(AG, 0x2A, 16384);
    let raw = imu.read_accel(Axis::Y).unwrap();
    assert_eq!(imu.calc_accel(raw), 16.0 / 32768.0 * 16384.0);
}

#[test]
fn interrupt_and_fifo_register_programming() {
    let bus = MockBus::new();
    let (imu, _tx) = driver(&bus);

    imu.config_int(
        IntSelect::Int1,
        int_gen::DRDY_G | int_gen::DRDY_XL,
        ActiveLevel::Low,
        PinMode::OpenDrain,
    )
    .unwrap();
    assert_eq!(bus.reg(AG, 0x0C), 0x03);
    assert_eq!(bus.reg(AG, 0x22), 0x30);

    imu.set_fifo(FifoMode::Continuous, 200).unwrap();
    assert_eq!(bus.reg(AG, 0x2E), 0xBF);

    imu.enable_fifo(true).unwrap();
    assert_eq!(bus.reg(AG, 0x23), 0x02);
    imu.sleep_gyro(true).unwrap();
    assert_eq!(bus.reg(AG, 0x23), 0x42);

    imu.mag_offset(Axis::Y, -256).unwrap();
    assert_eq!(bus.reg(MAG, 0x07), 0x00);
    assert_eq!(bus.reg(MAG, 0x08), 0xFF);

    bus.set(AG, 0x2F, 0b1100_1010);
    let fifo = imu.fifo_status().unwrap();
    assert!(fifo.threshold_reached());
    assert!(fifo.overrun());
    assert_eq!(imu.fifo_samples().unwrap(), 0x0A);
}

#[test]
fn event_interrupt_generators_and_sources() {
    let bus = MockBus::new();
    let (imu, _tx) = driver(&bus);

    imu.config_inactivity(5, 0x7F, true).unwrap();
    assert_eq!(bus.reg(AG, 0x04), 0xFF);
    assert_eq!(bus.reg(AG, 0x05), 5);

    imu.config_gyro_threshold(0x1234, Axis::X, 10, true).unwrap();
    assert_eq!(bus.reg(AG, 0x31), 0x12);
    assert_eq!(bus.reg(AG, 0x32), 0x34);
    assert_eq!(bus.reg(AG, 0x37), 0x8A);

    imu.config_mag_int(mag_int_gen::XIEN, ActiveLevel::High, false)
        .unwrap();
    assert_eq!(bus.reg(MAG, 0x30), 0x87);

    // Source registers mask to zero unless the interrupt-active bit is set.
    bus.set(AG, 0x26, 0x4A);
    assert_eq!(imu.accel_int_src().unwrap(), 0x0A);
    bus.set(AG, 0x26, 0x0A);
    assert_eq!(imu.accel_int_src().unwrap(), 0);
    bus.set(MAG, 0x31, 0x85);
    assert_eq!(imu.mag_int_src().unwrap(), 0x84);
}
