//! # Sentio - Platform Sensor Backend
//!
//! Sentio discovers the physical motion and environment sensors on a device,
//! exposes them through a uniform device-registry contract, and streams
//! sensor readings to consumers from a dedicated background polling thread.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! sentio = "0.1"
//! ```
//!
//! ```rust,no_run
//! use sentio::prelude::*;
//!
//! // The platform glue supplies the enumeration provider; here a fixed list.
//! let enumerator = StaticEnumerator::new(vec![RawSensorInfo::new(
//!     SensorKind::Accelerometer,
//!     "android.sensor.accelerometer",
//!     "accel",
//! )]);
//!
//! let mut driver = HostSensorBackend::new(Box::new(enumerator));
//! driver.init().expect("sensor backend init");
//! driver.detect();
//!
//! for index in 0..driver.num_sensors() {
//!     let name = driver.device_name(index, 64).expect("valid index");
//!     println!("sensor {}: {}", index, name);
//! }
//!
//! driver.quit();
//! ```
//!
//! ## Components
//!
//! - [`sentio_registry`]: device registry, descriptors and handles
//! - [`sentio_engine`]: poll source, wake signal, lifecycle and driver trait
//! - [`sentio_config`]: TOML configuration with env/CLI overrides
//! - [`sentio_observability`]: logging initialization and debug flags
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: daily-rotated per-run log files

pub use sentio_config;
pub use sentio_engine;
pub use sentio_observability;
pub use sentio_registry;

use std::time::Duration;

use sentio_config::SentioConfig;
use sentio_engine::{
    DummySensorBackend, EngineError, HostSensorBackend, Result as EngineResult, SensorDriver,
};
use sentio_registry::SensorEnumerator;

/// Build the configured sensor driver backend.
///
/// `backend.kind` selects the implementation; the enumeration provider is
/// supplied by the platform glue and is only consulted by backends that
/// actually enumerate hardware.
///
/// # Errors
///
/// Fails with [`EngineError::UnknownBackend`] for a backend kind this build
/// does not know. Configuration validation normally catches that earlier.
pub fn driver_from_config(
    config: &SentioConfig,
    enumerator: Box<dyn SensorEnumerator>,
) -> EngineResult<Box<dyn SensorDriver>> {
    match config.backend.kind.as_str() {
        "host" => {
            let backend = HostSensorBackend::new(enumerator)
                .with_join_warning(Duration::from_secs(config.poll.join_warn_secs));
            Ok(Box::new(backend))
        }
        "dummy" => Ok(Box::new(DummySensorBackend)),
        other => Err(EngineError::UnknownBackend(other.to_string())),
    }
}

/// Commonly used items in one import
pub mod prelude {
    pub use crate::driver_from_config;

    pub use sentio_config::{load_config, SentioConfig};
    pub use sentio_engine::{
        ChannelPollSource, DummySensorBackend, EngineError, HostSensorBackend, PollEvent,
        PollInjector, PollOutcome, PollSource, PollTimeout, SensorDriver, SensorRuntime,
        WakeSignal, SENSOR_EVENT_SOURCE,
    };
    pub use sentio_observability::{init_console_logging, parse_debug_flags, CrateDebugFlags};
    pub use sentio_registry::{
        BoundedStr, DataFormat, DeviceRegistry, RawSensorInfo, RegistryError, SensorEnumerator,
        SensorHandle, SensorKind, SensorReading, StaticEnumerator,
    };
}
