// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Poll source: the platform readiness-multiplexing seam
//!
//! The poll thread blocks on a [`PollSource`] the way a platform looper
//! thread blocks on its event multiplexer. The trait keeps the engine
//! independent of how events actually arrive; [`ChannelPollSource`] is the
//! channel-backed implementation used by the host backend and by tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use sentio_registry::SensorReading;

use crate::{EngineError, Result};

/// Source identifier for sensor events, matching the platform's user-event
/// looper ident. Events carrying any other identifier are not ours and get
/// ignored.
pub const SENSOR_EVENT_SOURCE: u32 = 3;

/// How long a single poll wait may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTimeout {
    /// Block until an event arrives or the source is woken
    Indefinite,
    /// Return immediately with whatever is already queued
    Immediate,
    /// Block for at most the given duration
    Bounded(Duration),
}

/// One event delivered by the poll source
#[derive(Debug, Clone)]
pub struct PollEvent {
    /// Which registered producer fired
    pub source: u32,
    /// Non-portable key of the sensor the reading belongs to
    pub key: String,
    pub reading: SensorReading,
}

/// Outcome of a single poll wait
#[derive(Debug)]
pub enum PollOutcome {
    Event(PollEvent),
    /// Nothing became ready within the timeout
    TimedOut,
    /// [`PollSource::wake`] interrupted the wait
    Woken,
    /// The producer side is gone; the caller should back off and retry later
    Closed,
}

/// Witness that a poll source has been prepared.
///
/// Move-only: releasing consumes the token, so a double release does not
/// compile rather than being a runtime hazard.
#[derive(Debug)]
pub struct PollToken {
    _private: (),
}

impl PollToken {
    /// Mint a prepare witness. Poll-source implementations create one per
    /// successful `prepare`.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for PollToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Readiness-multiplexing primitive the poll thread waits on
pub trait PollSource: Send + Sync {
    /// Attach the source. At most one prepare may be outstanding; a second
    /// call without an intervening release fails with
    /// [`EngineError::AlreadyPrepared`].
    fn prepare(&self) -> Result<PollToken>;

    /// Detach the source, consuming the prepare witness.
    fn release(&self, token: PollToken);

    /// Block until an event is ready, the timeout elapses, or the source is
    /// woken.
    fn wait_once(&self, timeout: PollTimeout) -> PollOutcome;

    /// Interrupt a blocked [`wait_once`](Self::wait_once) from another
    /// thread. The wait returns [`PollOutcome::Woken`].
    fn wake(&self);
}

/// Channel-backed poll source
///
/// Events flow through a crossbeam channel whose sender side lives in
/// [`PollInjector`] handles held by the platform glue. The source itself
/// keeps no event sender, so a dropped producer is observable as
/// [`PollOutcome::Closed`]. Wakes travel on a separate channel owned by the
/// source, which therefore stays functional after producers disconnect.
pub struct ChannelPollSource {
    event_rx: Receiver<PollEvent>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    prepared: AtomicBool,
}

impl ChannelPollSource {
    /// Create the source plus the producer handle feeding it.
    pub fn new() -> (Self, PollInjector) {
        let (event_tx, event_rx) = channel::unbounded();
        let (wake_tx, wake_rx) = channel::unbounded();
        let source = Self {
            event_rx,
            wake_tx,
            wake_rx,
            prepared: AtomicBool::new(false),
        };
        (source, PollInjector { event_tx })
    }
}

impl PollSource for ChannelPollSource {
    fn prepare(&self) -> Result<PollToken> {
        if self.prepared.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyPrepared);
        }
        Ok(PollToken::new())
    }

    fn release(&self, token: PollToken) {
        drop(token);
        self.prepared.store(false, Ordering::Release);
    }

    fn wait_once(&self, timeout: PollTimeout) -> PollOutcome {
        match timeout {
            PollTimeout::Indefinite => {
                crossbeam::channel::select! {
                    recv(self.event_rx) -> message => match message {
                        Ok(event) => PollOutcome::Event(event),
                        Err(_) => self.closed_or_woken(),
                    },
                    recv(self.wake_rx) -> _ => PollOutcome::Woken,
                }
            }
            PollTimeout::Immediate => match self.event_rx.try_recv() {
                Ok(event) => PollOutcome::Event(event),
                Err(TryRecvError::Empty) => match self.wake_rx.try_recv() {
                    Ok(()) => PollOutcome::Woken,
                    Err(_) => PollOutcome::TimedOut,
                },
                Err(TryRecvError::Disconnected) => self.closed_or_woken(),
            },
            PollTimeout::Bounded(limit) => {
                crossbeam::channel::select! {
                    recv(self.event_rx) -> message => match message {
                        Ok(event) => PollOutcome::Event(event),
                        Err(_) => self.closed_or_woken(),
                    },
                    recv(self.wake_rx) -> _ => PollOutcome::Woken,
                    default(limit) => PollOutcome::TimedOut,
                }
            }
        }
    }

    fn wake(&self) {
        let _ = self.wake_tx.send(());
    }
}

impl ChannelPollSource {
    /// A disconnect must not mask a pending wake, or a shutdown interrupt
    /// delivered after the producers dropped would be lost.
    fn closed_or_woken(&self) -> PollOutcome {
        match self.wake_rx.try_recv() {
            Ok(()) => PollOutcome::Woken,
            Err(_) => PollOutcome::Closed,
        }
    }
}

/// Clonable producer handle for a [`ChannelPollSource`]
///
/// Platform glue (or a test) pushes sensor events through this.
#[derive(Clone)]
pub struct PollInjector {
    event_tx: Sender<PollEvent>,
}

impl PollInjector {
    /// Push an event. Returns false once the source is gone.
    pub fn inject(&self, event: PollEvent) -> bool {
        self.event_tx.send(event).is_ok()
    }

    /// Push a sensor reading under the sensor-event source identifier.
    pub fn inject_reading(&self, key: &str, reading: SensorReading) -> bool {
        self.inject(PollEvent {
            source: SENSOR_EVENT_SOURCE,
            key: key.to_string(),
            reading,
        })
    }
}
