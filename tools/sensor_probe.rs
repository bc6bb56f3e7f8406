// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Sensor Probe Tool

Smoke-tests the sensor backend end to end: brings the driver up, detects a
synthetic device list, streams a burst of readings through the poll loop and
prints what the registry cached, then shuts down.

Usage:
  cargo run --bin sensor_probe [-- --debug-sentio-engine]

The configured backend is honored (`sentio.toml`, `SENTIO_BACKEND`); with no
config file present the defaults apply.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::thread;
use std::time::Duration;

use sentio::prelude::*;
use sentio_config::{ConfigError, SentioConfig};
use sentio_observability::{init_with_config, ObservabilityConfig};

fn main() -> anyhow::Result<()> {
    let flags = parse_debug_flags();

    let config = match load_config(None, None) {
        Ok(config) => config,
        // No config file is fine for a probe run; defaults are enough.
        Err(ConfigError::FileNotFound(_)) => SentioConfig::default(),
        Err(e) => return Err(e.into()),
    };

    let mut observability = ObservabilityConfig::default();
    observability.logging.level = config.system.log_level.clone();
    let _guard = init_with_config(&observability, &flags)?;

    println!("Sentio Sensor Probe");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("backend: {}", config.backend.kind);
    println!();

    if config.backend.kind != "host" {
        // Only the host backend has a poll loop worth probing; still drive
        // the configured driver through the contract once.
        let mut driver = driver_from_config(&config, Box::new(StaticEnumerator::default()))?;
        driver.init()?;
        driver.detect();
        println!("{} sensor(s) reported", driver.num_sensors());
        driver.quit();
        return Ok(());
    }

    let enumerator = StaticEnumerator::new(vec![
        RawSensorInfo::new(SensorKind::Accelerometer, "android.sensor.accelerometer", "accel"),
        RawSensorInfo::new(SensorKind::Gyroscope, "android.sensor.gyroscope", "gyro"),
        RawSensorInfo::new(SensorKind::Light, "android.sensor.light", "light"),
    ]);

    let mut driver = HostSensorBackend::new(Box::new(enumerator))
        .with_join_warning(Duration::from_secs(config.poll.join_warn_secs));
    driver.init()?;
    driver.detect();

    println!("{} sensor(s) detected:", driver.num_sensors());
    for index in 0..driver.num_sensors() {
        let kind = driver.sensor_kind(index)?;
        let name = driver.device_name(index, 64)?;
        let key = driver.non_portable_type(index)?;
        println!("  [{}] {:?} '{}' ({})", index, kind, name, key);
    }
    println!();

    let accel = driver
        .device(0)
        .ok_or_else(|| anyhow::anyhow!("device 0 disappeared"))?;
    driver.open(&accel)?;
    driver.set_data_rate(&accel, 60.0);

    // Feed a short synthetic burst through the poll source, the way the
    // platform glue would.
    let injector = driver.injector();
    let producer = thread::spawn(move || {
        for i in 0..5u64 {
            injector.inject_reading(
                "android.sensor.accelerometer",
                SensorReading::new([0.01 * i as f32, 0.0, 9.81], i * 16_000),
            );
            thread::sleep(Duration::from_millis(10));
        }
    });

    for _ in 0..10 {
        driver.notify();
        thread::sleep(Duration::from_millis(20));
        if let Some(reading) = driver.update(&accel) {
            println!(
                "accel reading: [{:+.3} {:+.3} {:+.3}] @ {}us",
                reading.values[0], reading.values[1], reading.values[2], reading.timestamp_us
            );
        }
    }
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;

    driver.close(&accel);
    driver.quit();
    println!();
    println!("probe complete; {} sensor(s) after quit", driver.num_sensors());

    Ok(())
}
