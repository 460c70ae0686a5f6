#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The lights task publishes a `StatusSnapshot` after every tick; the console
//! reads it back for `status` without touching the scheduler itself.

use lights_core::controller::OverallState;
use lights_core::lights::LightMask;
use lights_core::repl::status::StatusSnapshot;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

static OVERALL: AtomicU8 = AtomicU8::new(OverallState::Stopped.to_raw());
/// Mask last latched into the shift register.
static APPLIED: AtomicU8 = AtomicU8::new(0);
static SEQUENCE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Stores the latest scheduler state.
pub fn publish(snapshot: StatusSnapshot) {
    OVERALL.store(snapshot.overall.to_raw(), Ordering::Relaxed);
    APPLIED.store(snapshot.applied.bits(), Ordering::Relaxed);
    SEQUENCE_ACTIVE.store(snapshot.active, Ordering::Relaxed);
}

/// Builds a [`StatusSnapshot`] from the stored values.
pub fn snapshot() -> StatusSnapshot {
    let overall =
        OverallState::from_raw(OVERALL.load(Ordering::Relaxed)).unwrap_or(OverallState::Stopped);
    StatusSnapshot::new(
        overall,
        LightMask::from_bits(APPLIED.load(Ordering::Relaxed)),
        SEQUENCE_ACTIVE.load(Ordering::Relaxed),
    )
}
