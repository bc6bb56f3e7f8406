//! Sensor enumeration provider seam
//!
//! The registry never talks to hardware directly. Platform glue implements
//! [`SensorEnumerator`] and the registry rebuilds itself from whatever the
//! provider reports at detection time.

use serde::{Deserialize, Serialize};

use crate::types::SensorKind;

/// Raw hardware descriptor as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSensorInfo {
    /// Portable sensor kind
    pub kind: SensorKind,
    /// Opaque platform identifier (e.g. `android.sensor.accelerometer`)
    pub non_portable_key: String,
    /// Human-readable label
    pub name: String,
}

impl RawSensorInfo {
    pub fn new(kind: SensorKind, non_portable_key: &str, name: &str) -> Self {
        Self {
            kind,
            non_portable_key: non_portable_key.to_string(),
            name: name.to_string(),
        }
    }
}

/// Supplies raw hardware descriptors to [`DeviceRegistry::detect`]
///
/// [`DeviceRegistry::detect`]: crate::registry::DeviceRegistry::detect
pub trait SensorEnumerator: Send + Sync {
    fn enumerate(&self) -> Vec<RawSensorInfo>;
}

/// Enumerator over a fixed descriptor list
///
/// Used by hosts that assemble the device list themselves, and by tests and
/// the probe tool.
#[derive(Debug, Clone, Default)]
pub struct StaticEnumerator {
    sensors: Vec<RawSensorInfo>,
}

impl StaticEnumerator {
    pub fn new(sensors: Vec<RawSensorInfo>) -> Self {
        Self { sensors }
    }
}

impl SensorEnumerator for StaticEnumerator {
    fn enumerate(&self) -> Vec<RawSensorInfo> {
        self.sensors.clone()
    }
}
