// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sensor driver contract and backends
//!
//! The hosting framework drives the backend through a fixed operation set;
//! [`SensorDriver`] is that contract as a trait, with the concrete backend
//! chosen at configuration time. [`HostSensorBackend`] is the real one;
//! [`DummySensorBackend`] reports no sensors and exists for hosts built
//! without sensor support.

use std::sync::Arc;

use tracing::warn;

use sentio_registry::{
    BoundedStr, DataFormat, DeviceRegistry, RegistryError, SensorEnumerator, SensorHandle,
    SensorKind, SensorReading, MAX_KEY_LEN,
};

use crate::poll::{ChannelPollSource, PollInjector};
use crate::runtime::SensorRuntime;
use crate::Result;

/// Uniform driver contract the hosting framework calls into
///
/// One trait method per framework entry point. Indexed accessors validate
/// the index and return typed errors; handle-based operations act on the
/// descriptor the handle references. `update` is called from the host's
/// per-frame pump and must never block on I/O.
pub trait SensorDriver: Send {
    /// Bring up lifecycle resources. Idempotent.
    fn init(&mut self) -> Result<()>;

    /// Tear everything down and invalidate handles. Safe without `init`.
    fn quit(&mut self);

    fn num_sensors(&self) -> usize;

    fn sensor_kind(&self, index: usize) -> Result<SensorKind>;

    /// Non-portable platform key, bounded to the fixed key budget.
    fn non_portable_type(&self, index: usize) -> Result<BoundedStr>;

    fn device(&self, index: usize) -> Option<SensorHandle>;

    /// Alias of [`device`](Self::device), kept because the framework
    /// exposes both entry points.
    fn device_by_index(&self, index: usize) -> Option<SensorHandle> {
        self.device(index)
    }

    fn device_name(&self, index: usize, max_len: usize) -> Result<BoundedStr>;

    /// (Re)populate the device list from the platform.
    fn detect(&mut self);

    fn open(&self, device: &SensorHandle) -> Result<()>;

    /// Permissive close: a stale handle is a no-op, not an error.
    fn close(&self, device: &SensorHandle);

    /// Last cached reading for the device. Non-blocking by contract.
    fn update(&self, device: &SensorHandle) -> Option<SensorReading>;

    /// Advisory; silently ignored by hardware that cannot honor it.
    fn set_data_format(&self, device: &SensorHandle, format: DataFormat);

    /// Advisory; silently ignored by hardware that cannot honor it.
    fn set_data_rate(&self, device: &SensorHandle, rate_hz: f32);
}

/// The real backend: registry + poll runtime + platform enumerator
pub struct HostSensorBackend {
    runtime: SensorRuntime,
    enumerator: Box<dyn SensorEnumerator>,
    injector: PollInjector,
}

impl HostSensorBackend {
    /// Build a backend around the given enumeration provider.
    pub fn new(enumerator: Box<dyn SensorEnumerator>) -> Self {
        let (poll, injector) = ChannelPollSource::new();
        let registry = Arc::new(DeviceRegistry::new());
        let runtime = SensorRuntime::new(registry, Arc::new(poll));
        Self {
            runtime,
            enumerator,
            injector,
        }
    }

    pub fn with_join_warning(mut self, join_warn: std::time::Duration) -> Self {
        self.runtime = self.runtime.with_join_warning(join_warn);
        self
    }

    /// Producer handle for the platform glue feeding sensor events in.
    pub fn injector(&self) -> PollInjector {
        self.injector.clone()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        self.runtime.registry()
    }

    /// Wake the poll thread; call when the platform signals pending data.
    pub fn notify(&self) {
        self.runtime.notify();
    }
}

impl SensorDriver for HostSensorBackend {
    fn init(&mut self) -> Result<()> {
        self.runtime.init()
    }

    fn quit(&mut self) {
        self.runtime.quit();
    }

    fn num_sensors(&self) -> usize {
        self.runtime.registry().count()
    }

    fn sensor_kind(&self, index: usize) -> Result<SensorKind> {
        Ok(self.runtime.registry().kind_of(index)?)
    }

    fn non_portable_type(&self, index: usize) -> Result<BoundedStr> {
        Ok(self
            .runtime
            .registry()
            .non_portable_key_of(index, MAX_KEY_LEN)?)
    }

    fn device(&self, index: usize) -> Option<SensorHandle> {
        self.runtime.registry().handle_of(index)
    }

    fn device_name(&self, index: usize, max_len: usize) -> Result<BoundedStr> {
        let name = self.runtime.registry().name_of(index, max_len)?;
        if name.is_truncated() {
            warn!(
                "device name at index {} truncated to {} bytes",
                index, max_len
            );
        }
        Ok(name)
    }

    fn detect(&mut self) {
        self.runtime.registry().detect(self.enumerator.as_ref());
    }

    fn open(&self, device: &SensorHandle) -> Result<()> {
        device.open()?;
        // The platform arms the event queue when a sensor opens; give the
        // poll thread a chance to service it.
        self.runtime.notify();
        Ok(())
    }

    fn close(&self, device: &SensorHandle) {
        device.close();
    }

    fn update(&self, device: &SensorHandle) -> Option<SensorReading> {
        device.last_reading()
    }

    fn set_data_format(&self, device: &SensorHandle, format: DataFormat) {
        device.set_data_format(format);
    }

    fn set_data_rate(&self, device: &SensorHandle, rate_hz: f32) {
        device.set_data_rate(rate_hz);
    }
}

/// Backend that reports no sensors
///
/// For hosts built without sensor support: every operation is a well-typed
/// no-op and every indexed accessor fails cleanly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummySensorBackend;

impl SensorDriver for DummySensorBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn quit(&mut self) {}

    fn num_sensors(&self) -> usize {
        0
    }

    fn sensor_kind(&self, index: usize) -> Result<SensorKind> {
        Err(RegistryError::InvalidIndex { index, count: 0 }.into())
    }

    fn non_portable_type(&self, index: usize) -> Result<BoundedStr> {
        Err(RegistryError::InvalidIndex { index, count: 0 }.into())
    }

    fn device(&self, _index: usize) -> Option<SensorHandle> {
        None
    }

    fn device_name(&self, index: usize, _max_len: usize) -> Result<BoundedStr> {
        Err(RegistryError::InvalidIndex { index, count: 0 }.into())
    }

    fn detect(&mut self) {}

    fn open(&self, device: &SensorHandle) -> Result<()> {
        Ok(device.open()?)
    }

    fn close(&self, device: &SensorHandle) {
        device.close();
    }

    fn update(&self, device: &SensorHandle) -> Option<SensorReading> {
        device.last_reading()
    }

    fn set_data_format(&self, device: &SensorHandle, format: DataFormat) {
        device.set_data_format(format);
    }

    fn set_data_rate(&self, device: &SensorHandle, rate_hz: f32) {
        device.set_data_rate(rate_hz);
    }
}
