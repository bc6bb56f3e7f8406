// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sensor runtime - lifecycle controller for the background poll loop
//!
//! Owns the poll-source prepare token, the wake signal, the shutdown flag
//! and the thread handle, and guarantees each is created and destroyed
//! exactly once. `init()` is re-entrant per resource; `quit()` runs the
//! wake-then-join shutdown protocol and is safe to call without a prior
//! `init()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use sentio_registry::DeviceRegistry;

use crate::poll::{PollOutcome, PollSource, PollTimeout, PollToken, SENSOR_EVENT_SOURCE};
use crate::wake::WakeSignal;
use crate::{EngineError, Result};

/// Stack size for the poll thread. The loop keeps nothing of consequence on
/// the stack, so a small fixed allocation is plenty.
pub const POLL_THREAD_STACK_BYTES: usize = 64 * 1024;

const DEFAULT_JOIN_WARN: Duration = Duration::from_secs(2);

/// Lifecycle controller for the sensor poll loop
///
/// One owned instance per backend; there is no process-global state. All
/// synchronous registry access goes through [`registry()`](Self::registry),
/// while the runtime's own job is starting and stopping the thread that
/// feeds it.
pub struct SensorRuntime {
    registry: Arc<DeviceRegistry>,
    poll: Arc<dyn PollSource>,
    /// Witness that the poll source is prepared; `None` until init
    poll_token: Option<PollToken>,
    wake: Option<Arc<WakeSignal>>,
    /// Shutdown flag (atomic for thread-safe stop)
    shutdown: Arc<AtomicBool>,
    /// Thread handle (for graceful shutdown)
    thread_handle: Option<thread::JoinHandle<()>>,
    join_warn: Duration,
}

impl SensorRuntime {
    pub fn new(registry: Arc<DeviceRegistry>, poll: Arc<dyn PollSource>) -> Self {
        Self {
            registry,
            poll,
            poll_token: None,
            wake: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            join_warn: DEFAULT_JOIN_WARN,
        }
    }

    /// How long `quit()` waits before logging that the join is slow. The
    /// join itself stays unbounded; shutdown must complete.
    pub fn with_join_warning(mut self, join_warn: Duration) -> Self {
        self.join_warn = join_warn;
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Whether the poll thread is currently alive.
    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Wake the poll thread so it services the poll source.
    ///
    /// Host glue calls this whenever the platform signals that sensor data
    /// may be pending. A no-op before `init()`.
    pub fn notify(&self) {
        if let Some(wake) = &self.wake {
            wake.post();
        }
    }

    /// Bring up the poll source, wake signal and poll thread.
    ///
    /// Idempotent per resource: anything that already exists is skipped, so
    /// a repeated `init()` never double-creates. On failure the resources
    /// created so far stay intact - the caller may retry or `quit()` to
    /// unwind.
    pub fn init(&mut self) -> Result<()> {
        if self.poll_token.is_none() {
            let token = self
                .poll
                .prepare()
                .map_err(|e| EngineError::PollSourcePrepareFailed(e.to_string()))?;
            self.poll_token = Some(token);
            debug!("poll source prepared");
        }

        let wake = match &self.wake {
            Some(signal) => Arc::clone(signal),
            None => {
                let signal = Arc::new(WakeSignal::new());
                self.wake = Some(Arc::clone(&signal));
                debug!("wake signal created");
                signal
            }
        };

        if self.thread_handle.is_none() {
            self.shutdown.store(false, Ordering::Release);

            let registry = Arc::clone(&self.registry);
            let poll = Arc::clone(&self.poll);
            let shutdown = Arc::clone(&self.shutdown);

            self.thread_handle = Some(
                thread::Builder::new()
                    .name("sentio-poll-loop".to_string())
                    .stack_size(POLL_THREAD_STACK_BYTES)
                    .spawn(move || poll_loop(registry, poll, wake, shutdown))
                    .map_err(|e| EngineError::ThreadCreateFailed(e.to_string()))?,
            );
            info!("sensor poll thread started");
        }

        Ok(())
    }

    /// Shut down the poll thread and release every lifecycle resource.
    ///
    /// Protocol: store the shutdown flag, wake the poll source (in case the
    /// thread is inside an indefinite poll wait), post the wake signal once,
    /// then join. The flag store happens-before the post, and the post
    /// happens-before the thread's next wake observation, so the shutdown
    /// cannot be missed. Afterwards the registry is cleared, invalidating
    /// all outstanding handles. Safe to call when never initialized.
    pub fn quit(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!("stopping sensor poll thread");
            self.shutdown.store(true, Ordering::Release);
            self.poll.wake();
            if let Some(wake) = &self.wake {
                wake.post();
            }

            // Join through a channel so a slow shutdown gets a diagnostic;
            // the wait itself is unbounded.
            let (tx, rx) = std::sync::mpsc::channel();
            let waiter = thread::spawn(move || {
                let _ = tx.send(handle.join());
            });

            let joined = match rx.recv_timeout(self.join_warn) {
                Ok(result) => Some(result),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    warn!(
                        "sensor poll thread still running after {:?}, waiting for join",
                        self.join_warn
                    );
                    rx.recv().ok()
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => None,
            };
            match joined {
                Some(Ok(())) => info!("sensor poll thread stopped"),
                Some(Err(_)) => warn!("sensor poll thread panicked during shutdown"),
                None => warn!("join waiter disconnected unexpectedly"),
            }
            let _ = waiter.join();

            self.shutdown.store(false, Ordering::Release);
        }

        if let Some(token) = self.poll_token.take() {
            self.poll.release(token);
            debug!("poll source released");
        }
        self.wake = None;
        self.registry.clear();
    }
}

impl Drop for SensorRuntime {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Body of the poll thread.
///
/// Waits on the wake signal, re-checks the shutdown flag, then services the
/// poll source: one blocking wait followed by a non-blocking drain. Poll
/// failures are logged and swallowed - the loop only ever exits through the
/// shutdown protocol, because a silently dead thread would leave every
/// sensor permanently stale with no caller-visible signal.
fn poll_loop(
    registry: Arc<DeviceRegistry>,
    poll: Arc<dyn PollSource>,
    wake: Arc<WakeSignal>,
    shutdown: Arc<AtomicBool>,
) {
    debug!("sensor poll thread entering wake wait");
    loop {
        wake.wait();
        // The very next step after any wake: a quit() must never be
        // deferred behind another poll wait.
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        let mut outcome = poll.wait_once(PollTimeout::Indefinite);
        loop {
            match outcome {
                PollOutcome::Event(event) => {
                    if event.source == SENSOR_EVENT_SOURCE {
                        if !registry.apply_reading(&event.key, event.reading) {
                            trace!("no registry entry for sensor key '{}'", event.key);
                        }
                    }
                    // Events from unrelated sources are ignored without
                    // ending the drain.
                }
                PollOutcome::Woken | PollOutcome::TimedOut => break,
                PollOutcome::Closed => {
                    warn!("poll source closed; retrying on next wake");
                    break;
                }
            }
            outcome = poll.wait_once(PollTimeout::Immediate);
        }
        // Readings are cached for every matching entry regardless of its
        // open flag; skipping unopened devices would be a valid
        // optimization but is not part of the contract.
    }
    debug!("sensor poll thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::{ChannelPollSource, PollEvent, PollInjector};
    use sentio_registry::{RawSensorInfo, SensorKind, SensorReading, StaticEnumerator};
    use std::time::Instant;

    fn runtime_with_sensors() -> (SensorRuntime, PollInjector) {
        let (poll, injector) = ChannelPollSource::new();
        let registry = Arc::new(DeviceRegistry::new());
        registry.detect(&StaticEnumerator::new(vec![
            RawSensorInfo::new(SensorKind::Accelerometer, "android.sensor.accelerometer", "accel"),
            RawSensorInfo::new(SensorKind::Gyroscope, "android.sensor.gyroscope", "gyro"),
        ]));
        (SensorRuntime::new(registry, Arc::new(poll)), injector)
    }

    /// Poll the registry until the predicate holds or the deadline passes.
    fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        predicate()
    }

    #[test]
    fn test_init_is_idempotent() {
        let (mut runtime, _injector) = runtime_with_sensors();

        runtime.init().unwrap();
        assert!(runtime.is_running());

        // A second init must not double-create anything; in particular the
        // already-prepared poll source must not trip it up.
        runtime.init().unwrap();
        assert!(runtime.is_running());

        runtime.quit();
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_quit_without_init_is_noop() {
        let (mut runtime, _injector) = runtime_with_sensors();
        runtime.quit();
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_quit_clears_registry_and_handles() {
        let (mut runtime, _injector) = runtime_with_sensors();
        runtime.init().unwrap();

        let handle = runtime.registry().handle_of(0).unwrap();
        runtime.quit();

        assert_eq!(runtime.registry().count(), 0);
        assert!(handle.is_detached());
        assert!(handle.open().is_err());
    }

    #[test]
    fn test_immediate_quit_joins_promptly() {
        let (mut runtime, _injector) = runtime_with_sensors();
        runtime.init().unwrap();

        // Quit before any poll event has ever arrived. The thread must see
        // the flag on its first wake and terminate; a hang here fails the
        // test by timeout.
        let start = Instant::now();
        runtime.quit();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_quit_interrupts_indefinite_poll_wait() {
        let (mut runtime, _injector) = runtime_with_sensors();
        runtime.init().unwrap();

        // Push the thread past the wake wait into the indefinite poll wait.
        runtime.notify();
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        runtime.quit();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_readings_flow_to_registry() {
        let (mut runtime, injector) = runtime_with_sensors();
        runtime.init().unwrap();

        injector.inject_reading(
            "android.sensor.gyroscope",
            SensorReading::new([0.5, -0.5, 0.25], 777),
        );
        runtime.notify();

        let registry = Arc::clone(runtime.registry());
        let arrived = wait_until(Duration::from_secs(2), || {
            registry
                .handle_of(1)
                .and_then(|device| device.last_reading())
                .is_some()
        });
        assert!(arrived, "reading never reached the registry");

        let reading = registry.handle_of(1).unwrap().last_reading().unwrap();
        assert_eq!(reading.values, [0.5, -0.5, 0.25]);
        assert_eq!(reading.timestamp_us, 777);

        runtime.quit();
    }

    #[test]
    fn test_drain_handles_batched_events() {
        let (mut runtime, injector) = runtime_with_sensors();
        runtime.init().unwrap();

        for i in 0..10u64 {
            injector.inject_reading(
                "android.sensor.accelerometer",
                SensorReading::new([i as f32, 0.0, 0.0], i),
            );
        }
        runtime.notify();

        let registry = Arc::clone(runtime.registry());
        let drained = wait_until(Duration::from_secs(2), || {
            registry
                .handle_of(0)
                .and_then(|device| device.last_reading())
                .is_some_and(|reading| reading.timestamp_us == 9)
        });
        assert!(drained, "drain did not reach the final batched event");

        runtime.quit();
    }

    #[test]
    fn test_unrelated_source_events_are_ignored() {
        let (mut runtime, injector) = runtime_with_sensors();
        runtime.init().unwrap();

        injector.inject(PollEvent {
            source: SENSOR_EVENT_SOURCE + 1,
            key: "android.sensor.accelerometer".to_string(),
            reading: SensorReading::new([9.0, 9.0, 9.0], 1),
        });
        injector.inject_reading(
            "android.sensor.accelerometer",
            SensorReading::new([1.0, 0.0, 0.0], 2),
        );
        runtime.notify();

        let registry = Arc::clone(runtime.registry());
        let arrived = wait_until(Duration::from_secs(2), || {
            registry
                .handle_of(0)
                .and_then(|device| device.last_reading())
                .is_some()
        });
        assert!(arrived);

        // The foreign-source event must not have been applied, and must not
        // have terminated the drain before the real one.
        let reading = registry.handle_of(0).unwrap().last_reading().unwrap();
        assert_eq!(reading.timestamp_us, 2);
        assert_eq!(reading.values, [1.0, 0.0, 0.0]);

        runtime.quit();
    }

    #[test]
    fn test_loop_survives_producer_disconnect() {
        let (mut runtime, injector) = runtime_with_sensors();
        runtime.init().unwrap();

        drop(injector);
        runtime.notify();
        thread::sleep(Duration::from_millis(50));

        // The loop swallowed the closed poll source; shutdown still works.
        assert!(runtime.is_running());
        let start = Instant::now();
        runtime.quit();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_reinit_after_quit() {
        let (mut runtime, injector) = runtime_with_sensors();
        runtime.init().unwrap();
        runtime.quit();
        assert_eq!(runtime.registry().count(), 0);

        // A fresh init must re-create every resource from scratch.
        runtime.init().unwrap();
        assert!(runtime.is_running());

        // The registry was cleared by quit; readings for the old keys are
        // simply dropped now.
        injector.inject_reading(
            "android.sensor.gyroscope",
            SensorReading::new([0.0, 1.0, 0.0], 5),
        );
        runtime.notify();
        thread::sleep(Duration::from_millis(50));

        runtime.quit();
    }

    #[test]
    fn test_quit_from_other_thread_races_init() {
        for _ in 0..10 {
            let (mut runtime, _injector) = runtime_with_sensors();
            runtime.init().unwrap();

            let handle = thread::spawn(move || {
                runtime.quit();
                runtime
            });
            let runtime = handle.join().unwrap();
            assert!(!runtime.is_running());
        }
    }

    #[test]
    fn test_drop_stops_thread() {
        let (mut runtime, _injector) = runtime_with_sensors();
        runtime.init().unwrap();
        // Drop must run the quit protocol without hanging.
        drop(runtime);
    }
}
