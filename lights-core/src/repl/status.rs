//! Shared status surface for the console.
//!
//! Both front-ends answer `status` by taking a [`StatusSnapshot`] of their
//! scheduler and rendering it through [`StatusFormatter`], so the text is the
//! same on the firmware UART and in the emulator.

use core::fmt;

use crate::controller::{LightDriver, LightScheduler, OverallState, SchedulerInstant};
use crate::lights::{ALL_LIGHTS, LightMask};

/// Point-in-time copy of the scheduler state shown by `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub overall: OverallState,
    /// Mask currently shown on the tower.
    pub applied: LightMask,
    /// `true` while a start sequence is running.
    pub active: bool,
}

impl StatusSnapshot {
    #[must_use]
    pub const fn new(overall: OverallState, applied: LightMask, active: bool) -> Self {
        Self {
            overall,
            applied,
            active,
        }
    }

    /// Builds a snapshot with every light off and nothing running.
    #[must_use]
    pub const fn idle() -> Self {
        Self::new(OverallState::Stopped, LightMask::EMPTY, false)
    }

    /// Captures the current state of `scheduler`.
    #[must_use]
    pub fn capture<D, I, const TELEMETRY: usize>(
        scheduler: &LightScheduler<D, I, TELEMETRY>,
    ) -> Self
    where
        D: LightDriver,
        I: SchedulerInstant,
    {
        Self::new(
            scheduler.overall_state(),
            scheduler.applied_mask(),
            scheduler.is_sequence_active(),
        )
    }
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the state line (e.g. `state STARTING sequence=active`).
    ///
    /// # Errors
    ///
    /// Propagates errors from `writer`.
    pub fn write_state_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "state {} sequence=", self.snapshot.overall)?;
        writer.write_str(if self.snapshot.active {
            "active"
        } else {
            "idle"
        })
    }

    /// Writes the lights line (e.g. `lights 0x24 yellow1 green`).
    ///
    /// # Errors
    ///
    /// Propagates errors from `writer`.
    pub fn write_lights_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "lights {}", self.snapshot.applied)?;
        if self.snapshot.applied.is_empty() {
            return writer.write_str(" (all off)");
        }
        for light in self.snapshot.applied.lit() {
            write!(writer, " {light}")?;
        }
        Ok(())
    }

    /// Writes a one-character-per-light strip in catalog order, `*` for lit.
    ///
    /// # Errors
    ///
    /// Propagates errors from `writer`.
    pub fn write_tower<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_char('[')?;
        for line in &ALL_LIGHTS {
            writer.write_char(if self.snapshot.applied.contains(line.light) {
                '*'
            } else {
                '.'
            })?;
        }
        writer.write_char(']')
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatter = StatusFormatter::new(self);
        formatter.write_state_line(f)?;
        f.write_str("\n")?;
        formatter.write_lights_line(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::Light;
    use core::fmt::Write;
    use heapless::String;

    #[test]
    fn renders_state_and_lit_lights() {
        let snapshot = StatusSnapshot::new(
            OverallState::Starting,
            LightMask::EMPTY.with(Light::Yellow1).with(Light::Green),
            true,
        );

        let mut out = String::<96>::new();
        write!(out, "{snapshot}").unwrap();
        assert_eq!(
            out.as_str(),
            "state STARTING sequence=active\nlights 0x24 yellow1 green"
        );
    }

    #[test]
    fn renders_idle_tower() {
        let snapshot = StatusSnapshot::idle();
        let formatter = StatusFormatter::new(&snapshot);

        let mut out = String::<32>::new();
        formatter.write_lights_line(&mut out).unwrap();
        assert_eq!(out.as_str(), "lights 0x00 (all off)");

        out.clear();
        let lit = StatusSnapshot::new(
            OverallState::Stopped,
            LightMask::EMPTY.with(Light::White).with(Light::Yellow3),
            false,
        );
        StatusFormatter::new(&lit).write_tower(&mut out).unwrap();
        assert_eq!(out.as_str(), "[*.....*]");
    }
}
