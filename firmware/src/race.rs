#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Race state shared between the console and the lights task.
//!
//! The timing side of a race is out of scope for the tower, so this handler
//! only tracks whether the race is waiting for the countdown and when the
//! timers were told to start.

use lights_core::race::{RaceState, RaceTimer};
use portable_atomic::{AtomicU8, AtomicU64, Ordering};

use crate::lights::FirmwareInstant;

const NOT_STARTED: u64 = 0;

/// Lock-free race state; a single static instance lives in the runtime.
pub struct RaceHandler {
    state: AtomicU8,
    /// Microsecond timestamp (+1) of the last timer start.
    started_micros: AtomicU64,
}

impl RaceHandler {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(RaceState::Stopped.to_raw()),
            started_micros: AtomicU64::new(NOT_STARTED),
        }
    }

    pub fn state(&self) -> RaceState {
        RaceState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Moves a stopped race into the countdown.
    pub fn begin_start(&self) {
        let _ = self.state.compare_exchange(
            RaceState::Stopped.to_raw(),
            RaceState::Starting.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn stop(&self) {
        self.state.store(RaceState::Stopped.to_raw(), Ordering::Release);
        self.started_micros.store(NOT_STARTED, Ordering::Release);
    }

    /// Microseconds since boot at which the timers started, if they have.
    pub fn started_at_micros(&self) -> Option<u64> {
        match self.started_micros.load(Ordering::Acquire) {
            NOT_STARTED => None,
            raw => Some(raw - 1),
        }
    }
}

impl Default for RaceHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceTimer<FirmwareInstant> for &RaceHandler {
    fn is_starting(&self) -> bool {
        self.state() == RaceState::Starting
    }

    fn start_timers(&mut self, at: FirmwareInstant) {
        let moved = self.state.compare_exchange(
            RaceState::Starting.to_raw(),
            RaceState::Running.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if moved.is_ok() {
            self.started_micros
                .store(at.as_micros().saturating_add(1), Ordering::Release);
        }
    }
}
