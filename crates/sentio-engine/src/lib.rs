// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Background polling engine for Sentio
//!
//! Owns everything with a lifecycle or a concurrency hazard in the sensor
//! backend: the poll source wrapping the platform's readiness multiplexer,
//! the counting wake signal, the dedicated poll thread that turns platform
//! events into registry updates, and the runtime that creates and tears all
//! of it down exactly once. The synchronous registry surface lives in
//! `sentio-registry`; this crate is the part that must not deadlock.

pub mod driver;
pub mod poll;
pub mod runtime;
pub mod wake;

pub use driver::{DummySensorBackend, HostSensorBackend, SensorDriver};
pub use poll::{
    ChannelPollSource, PollEvent, PollInjector, PollOutcome, PollSource, PollTimeout, PollToken,
    SENSOR_EVENT_SOURCE,
};
pub use runtime::{SensorRuntime, POLL_THREAD_STACK_BYTES};
pub use wake::WakeSignal;

use sentio_registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to prepare poll source: {0}")]
    PollSourcePrepareFailed(String),

    #[error("poll source is already prepared for this runtime")]
    AlreadyPrepared,

    /// Raised by platform wake-signal backends that can fail to allocate.
    #[error("failed to create wake signal: {0}")]
    SignalCreateFailed(String),

    #[error("failed to spawn sensor poll thread: {0}")]
    ThreadCreateFailed(String),

    #[error("unknown sensor backend '{0}'")]
    UnknownBackend(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
