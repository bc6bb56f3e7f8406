//! End-to-end driver contract tests through the umbrella crate
//!
//! Exercises the full framework-facing surface: config-driven backend
//! selection, detection, indexed lookup, open/close, reading flow and the
//! init/quit lifecycle.

use std::time::{Duration, Instant};

use sentio::prelude::*;

fn probe_sensors() -> StaticEnumerator {
    StaticEnumerator::new(vec![
        RawSensorInfo::new(SensorKind::Accelerometer, "android.sensor.accelerometer", "accel"),
        RawSensorInfo::new(SensorKind::Gyroscope, "android.sensor.gyroscope", "gyro"),
        RawSensorInfo::new(SensorKind::Light, "android.sensor.light", "light"),
    ])
}

fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

#[test]
fn framework_scenario_three_sensors() {
    let mut driver = HostSensorBackend::new(Box::new(probe_sensors()));

    driver.init().expect("init");
    driver.detect();

    assert_eq!(driver.num_sensors(), 3);
    assert_eq!(driver.device_name(1, 16).unwrap().as_str(), "gyro");
    assert!(matches!(
        driver.device_name(5, 16),
        Err(EngineError::Registry(RegistryError::InvalidIndex {
            index: 5,
            count: 3
        }))
    ));

    driver.quit();
}

#[test]
fn open_close_and_permissive_close_on_stale_handle() {
    let mut driver = HostSensorBackend::new(Box::new(probe_sensors()));
    driver.init().expect("init");
    driver.detect();

    let device = driver.device(0).expect("device 0");
    driver.open(&device).expect("open");
    assert!(device.is_open());

    driver.close(&device);
    assert!(!device.is_open());

    driver.quit();

    // After quit the handle is stale: open errors, close stays silent.
    assert!(matches!(
        driver.open(&device),
        Err(EngineError::Registry(RegistryError::NullDevice))
    ));
    driver.close(&device);
}

#[test]
fn readings_reach_update_through_the_poll_loop() {
    let mut driver = HostSensorBackend::new(Box::new(probe_sensors()));
    driver.init().expect("init");
    driver.detect();

    let gyro = driver.device(1).expect("device 1");
    driver.open(&gyro).expect("open");
    assert!(driver.update(&gyro).is_none());

    driver
        .injector()
        .inject_reading("android.sensor.gyroscope", SensorReading::new([0.1, 0.2, 0.3], 123));
    driver.notify();

    assert!(wait_until(Duration::from_secs(2), || driver
        .update(&gyro)
        .is_some()));
    let reading = driver.update(&gyro).unwrap();
    assert_eq!(reading.values, [0.1, 0.2, 0.3]);
    assert_eq!(reading.timestamp_us, 123);

    driver.quit();
}

#[test]
fn init_quit_cycle_invalidates_everything() {
    let mut driver = HostSensorBackend::new(Box::new(probe_sensors()));

    driver.init().expect("first init");
    driver.init().expect("second init is idempotent");
    driver.detect();
    assert_eq!(driver.num_sensors(), 3);

    let handle = driver.device(2).expect("device 2");
    driver.quit();

    assert_eq!(driver.num_sensors(), 0);
    assert!(driver.device(0).is_none());
    assert!(handle.is_detached());

    // quit again: documented no-op.
    driver.quit();
}

#[test]
fn config_selects_backend() {
    let mut config = SentioConfig::default();
    config.backend.kind = "dummy".to_string();

    let mut driver = driver_from_config(&config, Box::new(probe_sensors())).unwrap();
    driver.init().unwrap();
    driver.detect();
    assert_eq!(driver.num_sensors(), 0);
    assert!(driver.sensor_kind(0).is_err());
    driver.quit();

    config.backend.kind = "warp".to_string();
    assert!(driver_from_config(&config, Box::new(probe_sensors())).is_err());
}

#[test]
fn config_file_drives_the_driver() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentio.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[backend]").unwrap();
    writeln!(file, "kind = \"host\"").unwrap();
    writeln!(file, "[poll]").unwrap();
    writeln!(file, "join_warn_secs = 1").unwrap();

    let config = load_config(Some(&path), None).unwrap();
    let mut driver = driver_from_config(&config, Box::new(probe_sensors())).unwrap();

    driver.init().unwrap();
    driver.detect();
    assert_eq!(driver.num_sensors(), 3);
    driver.quit();
}
