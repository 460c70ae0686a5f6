//! Start-tower countdown shared by firmware and host targets.
//!
//! Four lamps light one after another for one second each. The final stage is
//! GREEN, and the race timers start while it is lit. The first stage used to be
//! RED; it now uses YELLOW3 so every countdown lamp before GREEN is yellow.

use core::time::Duration;

use super::{SequenceTemplate, StartStage};
use crate::lights::Light;
use crate::schedule::ScheduleSlot;

/// How long each countdown lamp stays lit.
pub const STAGE_DURATION: Duration = Duration::from_millis(1_000);

/// Ordered countdown stages, offsets measured from the moment the sequence arms.
pub const START_SEQUENCE_STAGES: [StartStage; 4] = [
    StartStage::new(
        ScheduleSlot::Yellow3,
        Light::Yellow3,
        Duration::ZERO,
        STAGE_DURATION,
    ),
    StartStage::new(
        ScheduleSlot::Yellow1,
        Light::Yellow1,
        STAGE_DURATION,
        STAGE_DURATION,
    ),
    StartStage::new(
        ScheduleSlot::Yellow2,
        Light::Yellow2,
        Duration::from_millis(2_000),
        STAGE_DURATION,
    ),
    StartStage::new(
        ScheduleSlot::Green,
        Light::Green,
        Duration::from_millis(3_000),
        STAGE_DURATION,
    ),
];

/// Light whose illumination releases the race timers.
pub const GO_LIGHT: Light = Light::Green;

/// Template describing the start countdown.
pub const START_SEQUENCE_TEMPLATE: SequenceTemplate =
    SequenceTemplate::new(&START_SEQUENCE_STAGES, GO_LIGHT);

/// Returns the shared start countdown template.
#[must_use]
pub const fn start_sequence_template() -> SequenceTemplate {
    START_SEQUENCE_TEMPLATE
}
