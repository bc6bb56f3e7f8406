//! Shutdown protocol tests
//!
//! The properties that matter: quit observed on the first wake, no missed
//! join, no deadlock - under racing callers and with the poll thread parked
//! in either of its two waits.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sentio::prelude::*;

fn one_sensor() -> StaticEnumerator {
    StaticEnumerator::new(vec![RawSensorInfo::new(
        SensorKind::Accelerometer,
        "android.sensor.accelerometer",
        "accel",
    )])
}

#[test]
fn quit_immediately_after_init() {
    // The background thread must observe the shutdown flag on its first
    // wake, before any poll event ever arrives.
    for _ in 0..20 {
        let mut driver = HostSensorBackend::new(Box::new(one_sensor()));
        driver.init().expect("init");

        let start = Instant::now();
        driver.quit();
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "quit took {:?}",
            start.elapsed()
        );
    }
}

#[test]
fn quit_from_another_thread() {
    let mut driver = HostSensorBackend::new(Box::new(one_sensor()));
    driver.init().expect("init");
    driver.detect();

    let quitter = thread::spawn(move || {
        driver.quit();
        driver
    });

    let driver = quitter.join().expect("quit thread");
    assert_eq!(driver.num_sensors(), 0);
}

#[test]
fn quit_with_thread_parked_in_poll_wait() {
    let mut driver = HostSensorBackend::new(Box::new(one_sensor()));
    driver.init().expect("init");
    driver.detect();

    // Wake with no event pending: the thread moves into the indefinite
    // poll wait and parks there.
    driver.notify();
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    driver.quit();
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn quit_with_producer_still_streaming() {
    let mut driver = HostSensorBackend::new(Box::new(one_sensor()));
    driver.init().expect("init");
    driver.detect();

    let injector = driver.injector();
    let running = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let running_producer = Arc::clone(&running);
    let producer = thread::spawn(move || {
        let mut i = 0u64;
        while running_producer.load(std::sync::atomic::Ordering::Relaxed) {
            injector.inject_reading(
                "android.sensor.accelerometer",
                SensorReading::new([0.0, 0.0, 9.8], i),
            );
            i += 1;
            thread::sleep(Duration::from_millis(1));
        }
    });

    for _ in 0..10 {
        driver.notify();
        thread::sleep(Duration::from_millis(2));
    }

    // Shutdown must win even while events keep arriving.
    let start = Instant::now();
    driver.quit();
    assert!(start.elapsed() < Duration::from_secs(2));

    running.store(false, std::sync::atomic::Ordering::Relaxed);
    producer.join().expect("producer");
}

#[test]
fn reinit_after_quit_detects_again() {
    let mut driver = HostSensorBackend::new(Box::new(one_sensor()));

    driver.init().expect("init");
    driver.detect();
    assert_eq!(driver.num_sensors(), 1);
    driver.quit();
    assert_eq!(driver.num_sensors(), 0);

    driver.init().expect("reinit");
    driver.detect();
    assert_eq!(driver.num_sensors(), 1);
    driver.quit();
}
