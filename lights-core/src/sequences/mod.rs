//! Light sequence data structures shared by firmware and host targets.
//!
//! The scheduler turns a [`SequenceTemplate`] into schedule-table deadlines
//! relative to the tick on which the sequence arms. Everything here is
//! `no_std` friendly and `const`, so the same data compiles for the firmware
//! and the host emulator.

use core::ops::Add;
use core::time::Duration;

use crate::lights::Light;
use crate::schedule::{ScheduleSlot, ScheduleTable};

pub mod start;

pub use start::{
    GO_LIGHT, STAGE_DURATION, START_SEQUENCE_STAGES, START_SEQUENCE_TEMPLATE,
    start_sequence_template,
};

/// One lamp of a sequence: lit at `on_after`, dark again `hold_for` later.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StartStage {
    pub slot: ScheduleSlot,
    pub light: Light,
    pub on_after: Duration,
    pub hold_for: Duration,
}

impl StartStage {
    #[must_use]
    pub const fn new(
        slot: ScheduleSlot,
        light: Light,
        on_after: Duration,
        hold_for: Duration,
    ) -> Self {
        Self {
            slot,
            light,
            on_after,
            hold_for,
        }
    }

    /// Offset from arming at which the lamp goes dark.
    #[must_use]
    pub const fn off_after(&self) -> Duration {
        self.on_after.saturating_add(self.hold_for)
    }
}

/// Immutable sequence template.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequenceTemplate {
    pub stages: &'static [StartStage],
    /// Light that signals the race timers once lit.
    pub go_light: Light,
}

impl SequenceTemplate {
    #[must_use]
    pub const fn new(stages: &'static [StartStage], go_light: Light) -> Self {
        Self { stages, go_light }
    }

    /// Returns the ordered stages of the sequence.
    #[must_use]
    pub const fn stages(&self) -> &'static [StartStage] {
        self.stages
    }

    /// Offset of the last turn-off deadline.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .map(StartStage::off_after)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Writes every stage into `table`, relative to `armed_at`.
    pub fn schedule_into<I>(&self, table: &mut ScheduleTable<I>, armed_at: I)
    where
        I: Copy + Ord + Add<Duration, Output = I>,
    {
        for stage in self.stages {
            table.schedule_on(stage.slot, stage.light, armed_at + stage.on_after);
            table.schedule_off(stage.slot, stage.light, armed_at + stage.off_after());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_into_offsets_from_arm_time() {
        const STAGES: [StartStage; 2] = [
            StartStage::new(
                ScheduleSlot::Red,
                Light::Red,
                Duration::ZERO,
                Duration::from_millis(250),
            ),
            StartStage::new(
                ScheduleSlot::Blue,
                Light::Blue,
                Duration::from_millis(250),
                Duration::from_millis(500),
            ),
        ];
        const TEMPLATE: SequenceTemplate = SequenceTemplate::new(&STAGES, Light::Blue);

        let mut table = ScheduleTable::new();
        let armed_at = Duration::from_millis(10_000);
        TEMPLATE.schedule_into(&mut table, armed_at);

        let red = table.entry(ScheduleSlot::Red);
        assert_eq!(red.turn_on_at, Some(Duration::from_millis(10_000)));
        assert_eq!(red.turn_off_at, Some(Duration::from_millis(10_250)));

        let blue = table.entry(ScheduleSlot::Blue);
        assert_eq!(blue.turn_on_at, Some(Duration::from_millis(10_250)));
        assert_eq!(blue.turn_off_at, Some(Duration::from_millis(10_750)));

        assert_eq!(TEMPLATE.total_duration(), Duration::from_millis(750));
        assert_eq!(table.pending_count(), 2);
    }
}
