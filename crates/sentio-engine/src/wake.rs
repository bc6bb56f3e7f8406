// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Counting wake signal for the poll thread

use parking_lot::{Condvar, Mutex};

/// Counting wake signal
///
/// A condvar-guarded counter rather than a boolean: posts accumulate, so a
/// shutdown request coalesces with any number of pending wake-ups without
/// either being lost. The waiter consumes exactly one post per wake and
/// re-checks its own predicate (the shutdown flag) after every wake.
pub struct WakeSignal {
    pending: Mutex<usize>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Post one wake-up. Never blocks.
    pub fn post(&self) {
        let mut pending = self.pending.lock();
        *pending += 1;
        self.condvar.notify_one();
    }

    /// Block until at least one post is pending, then consume it.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending == 0 {
            self.condvar.wait(&mut pending);
        }
        *pending -= 1;
    }

    /// Number of unconsumed posts. Diagnostic only.
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
