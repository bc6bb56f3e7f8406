//! Device registry implementation

use crate::enumerate::SensorEnumerator;
use crate::types::{BoundedStr, SensorDevice, SensorHandle, SensorKind, SensorReading};
use crate::{RegistryError, Result};
use log::{debug, info, trace};
use std::sync::{Arc, RwLock};

/// Registry of detected sensor devices
///
/// Holds the ordered device list: insertion order is detection order, and
/// indices stay stable until the registry is cleared or re-detected. All
/// indexed accessors validate `0 <= index < count` and surface a typed
/// error instead of ever reaching out of bounds.
pub struct DeviceRegistry {
    /// Detected devices in detection order
    devices: RwLock<Vec<SensorHandle>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Number of currently known devices
    pub fn count(&self) -> usize {
        self.devices.read().unwrap().len()
    }

    /// Portable kind of the device at `index`
    pub fn kind_of(&self, index: usize) -> Result<SensorKind> {
        let devices = self.devices.read().unwrap();
        let device = Self::slot(&devices, index)?;
        Ok(device.kind())
    }

    /// Non-portable platform key of the device at `index`, copied into at
    /// most `max_len` bytes
    pub fn non_portable_key_of(&self, index: usize, max_len: usize) -> Result<BoundedStr> {
        let devices = self.devices.read().unwrap();
        let device = Self::slot(&devices, index)?;
        Ok(BoundedStr::copy_from(device.non_portable_key(), max_len))
    }

    /// Human-readable name of the device at `index`, copied into at most
    /// `max_len` bytes
    pub fn name_of(&self, index: usize, max_len: usize) -> Result<BoundedStr> {
        let devices = self.devices.read().unwrap();
        let device = Self::slot(&devices, index)?;
        Ok(BoundedStr::copy_from(device.name(), max_len))
    }

    /// Handle for the device at `index`, or `None` when out of range
    ///
    /// Hot-path accessor: callers that tolerate "not found" get an `Option`
    /// instead of an error.
    pub fn handle_of(&self, index: usize) -> Option<SensorHandle> {
        self.devices.read().unwrap().get(index).cloned()
    }

    /// First device of the given kind, if any
    pub fn find_by_kind(&self, kind: SensorKind) -> Option<SensorHandle> {
        self.devices
            .read()
            .unwrap()
            .iter()
            .find(|device| device.kind() == kind)
            .cloned()
    }

    /// First device with the given name, if any
    pub fn find_by_name(&self, name: &str) -> Option<SensorHandle> {
        self.devices
            .read()
            .unwrap()
            .iter()
            .find(|device| device.name() == name)
            .cloned()
    }

    /// (Re)populate the registry from the enumeration provider.
    ///
    /// The new device list is built first and swapped in under the write
    /// lock, so readers observe either the previous list or the complete
    /// new one - never a partially rebuilt sequence. Handles into the
    /// previous list are detached.
    ///
    /// Expected to run during initialization, before the poll thread has
    /// observed any devices; the registry lock makes a concurrent call safe,
    /// but readings applied to the outgoing list are lost.
    pub fn detect(&self, provider: &dyn SensorEnumerator) {
        let fresh: Vec<SensorHandle> = provider
            .enumerate()
            .into_iter()
            .map(|info| Arc::new(SensorDevice::new(info.kind, &info.non_portable_key, &info.name)))
            .collect();

        info!("Sensor detection found {} device(s)", fresh.len());
        for device in &fresh {
            debug!(
                "  [{:?}] {} ({})",
                device.kind(),
                device.name(),
                device.non_portable_key()
            );
        }

        let mut devices = self.devices.write().unwrap();
        for device in devices.iter() {
            device.detach();
        }
        *devices = fresh;
    }

    /// Apply a reading to the device whose non-portable key matches.
    ///
    /// Poll-thread entry point. Returns false when no device matches; the
    /// event is dropped, which is fine - an unknown key just means the
    /// producer raced a re-detection.
    pub fn apply_reading(&self, key: &str, reading: SensorReading) -> bool {
        let devices = self.devices.read().unwrap();
        match devices.iter().find(|device| device.non_portable_key() == key) {
            Some(device) => {
                device.store_reading(reading);
                true
            }
            None => {
                trace!("Dropped reading for unknown sensor key '{}'", key);
                false
            }
        }
    }

    /// Detach every device and empty the registry (Quit path). All
    /// previously handed-out handles become invalid.
    pub fn clear(&self) {
        let mut devices = self.devices.write().unwrap();
        if devices.is_empty() {
            return;
        }
        info!("Clearing sensor registry ({} devices)", devices.len());
        for device in devices.iter() {
            device.detach();
        }
        devices.clear();
    }

    fn slot<'a>(devices: &'a [SensorHandle], index: usize) -> Result<&'a SensorHandle> {
        devices.get(index).ok_or(RegistryError::InvalidIndex {
            index,
            count: devices.len(),
        })
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
