//! Sensor device registry for Sentio
//!
//! This crate provides the device registry that the sensor driver exposes to
//! the hosting framework: an ordered list of detected sensor descriptors with
//! index/kind/name lookup, opaque device handles, and per-device open/close/
//! configure operations. How the hardware is actually enumerated is not this
//! crate's business - callers hand `detect()` a [`SensorEnumerator`]
//! implementation and the registry takes it from there.

pub mod enumerate;
pub mod registry;
pub mod types;

pub use enumerate::{RawSensorInfo, SensorEnumerator, StaticEnumerator};
pub use registry::DeviceRegistry;
pub use types::{
    BoundedStr, DataFormat, SensorDevice, SensorHandle, SensorKind, SensorReading, MAX_KEY_LEN,
    MAX_NAME_LEN,
};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid device index {index} (registry holds {count} devices)")]
    InvalidIndex { index: usize, count: usize },

    #[error("device handle refers to a detached sensor")]
    NullDevice,
}

pub type Result<T> = std::result::Result<T, RegistryError>;
