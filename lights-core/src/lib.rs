#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the flyball start-light controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing abstractions the other crates can adopt.
pub mod controller;
pub mod lights;
pub mod race;
pub mod repl;
pub mod schedule;
pub mod sequences;
pub mod telemetry;

pub use controller::{
    FAULT_FLASH_DURATION, LightCommand, LightDriver, LightScheduler, LightsError, OverallState,
};
pub use lights::{Light, LightMask, LightState};
pub use race::{RaceState, RaceTimer};
