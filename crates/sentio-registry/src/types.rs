//! Core types for sensor devices

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::{RegistryError, Result};

/// Maximum stored length of a human-readable device name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum stored length of a non-portable platform type key, in bytes.
///
/// The hosting framework retrieves the key into a fixed 64-byte slot, so
/// longer keys would be silently cut off downstream anyway.
pub const MAX_KEY_LEN: usize = 64;

/// Kind of physical sensor, following the platform sensor taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    /// Magnetic field / compass
    MagneticField,
    /// Ambient light level
    Light,
    Proximity,
    /// Barometric pressure
    Pressure,
    AmbientTemperature,
    RelativeHumidity,
    /// Platform sensor with no portable mapping; identified by its
    /// non-portable type key only
    Unknown,
}

/// Requested wire format for sensor samples
///
/// Advisory - hardware that cannot honor a format keeps delivering whatever
/// it natively produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Float32,
    Int16,
    Raw,
}

/// One cached sensor sample
///
/// Axes a sensor does not produce are left at zero (a light sensor fills
/// only `values[0]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub values: [f32; 3],
    /// Producer-supplied timestamp, microseconds
    pub timestamp_us: u64,
}

impl SensorReading {
    pub fn new(values: [f32; 3], timestamp_us: u64) -> Self {
        Self {
            values,
            timestamp_us,
        }
    }
}

/// Bounded string copy with an explicit truncation report
///
/// Replaces the raw-buffer + max-length copy convention: the returned value
/// never exceeds the requested byte budget, and `is_truncated()` tells the
/// caller whether anything was cut off. Truncation is a warning, not a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedStr {
    value: String,
    truncated: bool,
}

impl BoundedStr {
    /// Copy at most `max_len` bytes of `source`, cutting on a char boundary.
    pub(crate) fn copy_from(source: &str, max_len: usize) -> Self {
        if source.len() <= max_len {
            return Self {
                value: source.to_string(),
                truncated: false,
            };
        }
        let mut cut = max_len;
        while cut > 0 && !source.is_char_boundary(cut) {
            cut -= 1;
        }
        Self {
            value: source[..cut].to_string(),
            truncated: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for BoundedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Mutable per-device cell: last cached reading plus advisory configuration.
/// Written by the poll thread (reading) and by configuration setters
/// (format/rate); all access goes through the device's lock.
#[derive(Debug)]
struct DeviceCell {
    last_reading: Option<SensorReading>,
    data_format: DataFormat,
    data_rate_hz: f32,
}

/// One detected sensor device
///
/// Structurally immutable after detection: kind, key and name never change.
/// Only the open flag, the detached flag and the cached cell mutate, which is
/// what lets handles be shared freely between the caller's threads and the
/// poll thread.
#[derive(Debug)]
pub struct SensorDevice {
    kind: SensorKind,
    non_portable_key: String,
    name: String,
    open: AtomicBool,
    /// Set when the registry drops this slot (re-detection or clear); a
    /// detached device is what an expired handle points at.
    detached: AtomicBool,
    cell: RwLock<DeviceCell>,
}

/// Opaque reference to a registry slot, valid until the registry that
/// produced it is cleared.
pub type SensorHandle = Arc<SensorDevice>;

impl SensorDevice {
    pub(crate) fn new(kind: SensorKind, non_portable_key: &str, name: &str) -> Self {
        Self {
            kind,
            non_portable_key: BoundedStr::copy_from(non_portable_key, MAX_KEY_LEN).into_string(),
            name: BoundedStr::copy_from(name, MAX_NAME_LEN).into_string(),
            open: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            cell: RwLock::new(DeviceCell {
                last_reading: None,
                data_format: DataFormat::default(),
                data_rate_hz: 0.0,
            }),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn non_portable_key(&self) -> &str {
        &self.non_portable_key
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Whether the registry slot behind this handle is gone.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Mark the device open.
    ///
    /// Fails with [`RegistryError::NullDevice`] on a handle whose registry
    /// slot has been dropped.
    pub fn open(&self) -> Result<()> {
        if self.is_detached() {
            return Err(RegistryError::NullDevice);
        }
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    /// Mark the device closed. Permissive: closing a detached handle is a
    /// no-op rather than an error.
    pub fn close(&self) {
        if self.is_detached() {
            return;
        }
        self.open.store(false, Ordering::Release);
    }

    /// Last reading cached by the poll thread, if any. Never blocks on I/O.
    pub fn last_reading(&self) -> Option<SensorReading> {
        self.cell.read().unwrap().last_reading
    }

    /// Advisory format request. Silently kept even if the hardware ignores it.
    pub fn set_data_format(&self, format: DataFormat) {
        self.cell.write().unwrap().data_format = format;
    }

    /// Advisory rate request in Hz. Silently kept even if the hardware
    /// ignores it.
    pub fn set_data_rate(&self, rate_hz: f32) {
        self.cell.write().unwrap().data_rate_hz = rate_hz;
    }

    pub fn data_format(&self) -> DataFormat {
        self.cell.read().unwrap().data_format
    }

    pub fn data_rate_hz(&self) -> f32 {
        self.cell.read().unwrap().data_rate_hz
    }

    pub(crate) fn store_reading(&self, reading: SensorReading) {
        self.cell.write().unwrap().last_reading = Some(reading);
    }

    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> SensorDevice {
        SensorDevice::new(SensorKind::Accelerometer, "android.sensor.accelerometer", "accel")
    }

    #[test]
    fn test_open_close_flag() {
        let dev = device();
        assert!(!dev.is_open());

        dev.open().unwrap();
        assert!(dev.is_open());

        dev.close();
        assert!(!dev.is_open());
    }

    #[test]
    fn test_open_detached_is_null_device() {
        let dev = device();
        dev.detach();

        let result = dev.open();
        assert!(matches!(result, Err(RegistryError::NullDevice)));
        assert!(!dev.is_open());
    }

    #[test]
    fn test_close_detached_is_noop() {
        let dev = device();
        dev.open().unwrap();
        dev.detach();

        // Documented permissive behavior: no error, no panic.
        dev.close();
    }

    #[test]
    fn test_reading_cache() {
        let dev = device();
        assert!(dev.last_reading().is_none());

        dev.store_reading(SensorReading::new([0.1, 9.8, 0.0], 42));
        let reading = dev.last_reading().unwrap();
        assert_eq!(reading.values[1], 9.8);
        assert_eq!(reading.timestamp_us, 42);
    }

    #[test]
    fn test_advisory_configuration() {
        let dev = device();
        assert_eq!(dev.data_format(), DataFormat::Float32);

        dev.set_data_format(DataFormat::Int16);
        dev.set_data_rate(100.0);
        assert_eq!(dev.data_format(), DataFormat::Int16);
        assert_eq!(dev.data_rate_hz(), 100.0);
    }

    #[test]
    fn test_bounded_copy_within_budget() {
        let copy = BoundedStr::copy_from("gyro", 16);
        assert_eq!(copy.as_str(), "gyro");
        assert!(!copy.is_truncated());
    }

    #[test]
    fn test_bounded_copy_truncates() {
        let copy = BoundedStr::copy_from("ambient-temperature", 7);
        assert_eq!(copy.as_str(), "ambient");
        assert!(copy.is_truncated());
    }

    #[test]
    fn test_bounded_copy_respects_char_boundary() {
        // "héllo" is 6 bytes; cutting at 2 would land inside the 'é'.
        let copy = BoundedStr::copy_from("héllo", 2);
        assert_eq!(copy.as_str(), "h");
        assert!(copy.is_truncated());
    }

    #[test]
    fn test_name_bounded_at_construction() {
        let long_name = "x".repeat(MAX_NAME_LEN * 2);
        let dev = SensorDevice::new(SensorKind::Light, "light", &long_name);
        assert_eq!(dev.name().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_sensor_kind_serialization() {
        let json = serde_json::to_string(&SensorKind::Accelerometer).unwrap();
        assert_eq!(json, "\"accelerometer\"");

        let parsed: SensorKind = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(parsed, SensorKind::Light);
    }
}
