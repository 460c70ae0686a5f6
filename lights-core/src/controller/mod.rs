//! Light scheduler shared by firmware and host targets.
//!
//! [`LightScheduler`] owns the output bitmask, the schedule table and the
//! race-readiness state machine. The driver loop calls [`LightScheduler::tick`]
//! once per period; each tick runs the start-sequence choreographer, drains the
//! schedule table and flushes the mask to the [`LightDriver`] when it changed.
//! Commands from the console or race logic arrive between ticks on the same
//! thread of control, so nothing here locks.

use core::{fmt, ops::Add, time::Duration};

use crate::lights::{Light, LightMask, LightState, fault_light_for};
use crate::race::RaceTimer;
use crate::schedule::{ScheduleSlot, ScheduleTable};
use crate::sequences::{START_SEQUENCE_TEMPLATE, SequenceTemplate};
use crate::telemetry::{
    TELEMETRY_RING_CAPACITY, TelemetryEventKind, TelemetryInstant, TelemetryPayload,
    TelemetryRecorder,
};

pub mod queue;

pub use queue::{
    CommandEnqueueError, LIGHT_COMMAND_QUEUE_DEPTH, LightCommand, LightCommandBuffer,
    LightCommandQueue,
};

/// How long the white light flashes after a fault light is raised.
pub const FAULT_FLASH_DURATION: Duration = Duration::from_millis(1_000);

/// Slot used for the white fault flash.
pub const FAULT_FLASH_SLOT: ScheduleSlot = ScheduleSlot::White;

/// Monotonic instant accepted by the scheduler.
pub trait SchedulerInstant: TelemetryInstant + Ord + Add<Duration, Output = Self> {}

impl<T> SchedulerInstant for T where T: TelemetryInstant + Ord + Add<Duration, Output = T> {}

/// Race-readiness state owned by the scheduler.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OverallState {
    #[default]
    Stopped,
    Starting,
    /// Countdown finished. Only a reset leaves this state.
    Started,
}

impl OverallState {
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            OverallState::Stopped => 0,
            OverallState::Starting => 1,
            OverallState::Started => 2,
        }
    }

    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(OverallState::Stopped),
            1 => Some(OverallState::Starting),
            2 => Some(OverallState::Started),
            _ => None,
        }
    }
}

impl fmt::Display for OverallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverallState::Stopped => "STOPPED",
            OverallState::Starting => "STARTING",
            OverallState::Started => "STARTED",
        })
    }
}

/// Errors reported by the scheduler entry points.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightsError {
    /// No fault light is wired for the given zero-based dog index.
    InvalidDogIndex(usize),
    /// The previous start sequence finished; reset before starting again.
    ResetRequired,
}

impl fmt::Display for LightsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightsError::InvalidDogIndex(dog) => write!(f, "no fault light for dog {dog}"),
            LightsError::ResetRequired => f.write_str("reset required before restarting"),
        }
    }
}

/// Abstraction over the physical light output.
pub trait LightDriver {
    /// Pushes the complete mask to the lights. Fire-and-forget.
    fn write_mask(&mut self, mask: LightMask);
}

impl<T> LightDriver for &mut T
where
    T: LightDriver + ?Sized,
{
    fn write_mask(&mut self, mask: LightMask) {
        (**self).write_mask(mask);
    }
}

/// Light driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLightDriver;

impl NoopLightDriver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LightDriver for NoopLightDriver {
    fn write_mask(&mut self, _: LightMask) {}
}

/// Bookkeeping for a running start sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct SequenceSession<I> {
    armed_at: I,
    timers_signalled: bool,
}

/// Owns the light state and advances it once per tick.
pub struct LightScheduler<D, I, const TELEMETRY: usize = TELEMETRY_RING_CAPACITY>
where
    I: SchedulerInstant,
{
    driver: D,
    template: SequenceTemplate,
    overall: OverallState,
    applied: LightMask,
    pending: LightMask,
    schedule: ScheduleTable<I>,
    session: Option<SequenceSession<I>>,
    reset_pending: bool,
    telemetry: TelemetryRecorder<I, TELEMETRY>,
}

impl<D, I, const TELEMETRY: usize> LightScheduler<D, I, TELEMETRY>
where
    D: LightDriver,
    I: SchedulerInstant,
{
    /// Creates a scheduler running the standard start countdown.
    #[must_use]
    pub const fn new(driver: D) -> Self {
        Self::with_template(driver, START_SEQUENCE_TEMPLATE)
    }

    /// Creates a scheduler running a custom countdown.
    #[must_use]
    pub const fn with_template(driver: D, template: SequenceTemplate) -> Self {
        Self {
            driver,
            template,
            overall: OverallState::Stopped,
            applied: LightMask::EMPTY,
            pending: LightMask::EMPTY,
            schedule: ScheduleTable::new(),
            session: None,
            reset_pending: false,
            telemetry: TelemetryRecorder::new(),
        }
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    #[must_use]
    pub const fn overall_state(&self) -> OverallState {
        self.overall
    }

    /// Mask last pushed to the driver.
    #[must_use]
    pub const fn applied_mask(&self) -> LightMask {
        self.applied
    }

    /// Mask the next flush will push.
    #[must_use]
    pub const fn pending_mask(&self) -> LightMask {
        self.pending
    }

    /// Returns `true` while a start sequence session is running.
    #[must_use]
    pub const fn is_sequence_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn schedule(&self) -> &ScheduleTable<I> {
        &self.schedule
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryRecorder<I, TELEMETRY> {
        &self.telemetry
    }

    /// Reports whether `light` is lit in the pending mask.
    #[must_use]
    pub fn check_light_state(&self, light: Light) -> LightState {
        LightState::from_on(self.pending.contains(light))
    }

    /// Sets `light` in the pending mask, resolving `Toggle` once.
    ///
    /// Returns `true` when the mask changed.
    pub fn set_light_state(&mut self, light: Light, state: LightState) -> bool {
        let currently_on = self.pending.contains(light);
        let target = state.resolve(currently_on);
        if target == currently_on {
            return false;
        }

        self.pending = if target {
            self.pending.with(light)
        } else {
            self.pending.without(light)
        };
        true
    }

    /// Requests the start countdown. The choreographer arms on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`LightsError::ResetRequired`] once a countdown has completed.
    pub fn initiate_start_sequence(&mut self) -> Result<(), LightsError> {
        match self.overall {
            OverallState::Stopped => {
                self.overall = OverallState::Starting;
                Ok(())
            }
            OverallState::Starting => Ok(()),
            OverallState::Started => Err(LightsError::ResetRequired),
        }
    }

    /// Turns every light off and abandons any countdown.
    ///
    /// The output is flushed by the next tick.
    pub fn reset_lights(&mut self) {
        self.overall = OverallState::Stopped;
        self.pending = LightMask::EMPTY;
        self.schedule.clear_all();
        self.session = None;
        self.reset_pending = true;
    }

    /// Raises or clears the fault light for `dog`.
    ///
    /// Raising a fault also flashes the white light for
    /// [`FAULT_FLASH_DURATION`], restarting the flash if one is running. The
    /// fault light itself changes immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LightsError::InvalidDogIndex`] when no light is wired for `dog`.
    pub fn toggle_fault_light(
        &mut self,
        dog: usize,
        state: LightState,
        now: I,
    ) -> Result<Light, LightsError> {
        let light = fault_light_for(dog).ok_or(LightsError::InvalidDogIndex(dog))?;

        if state == LightState::On {
            self.schedule.schedule_on(FAULT_FLASH_SLOT, Light::White, now);
            self.schedule
                .schedule_off(FAULT_FLASH_SLOT, Light::White, now + FAULT_FLASH_DURATION);
        }

        self.set_light_state(light, state);
        self.telemetry.record_fault(dog, light, state, now);
        Ok(light)
    }

    /// Executes a dequeued command.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying entry point.
    pub fn apply_command(&mut self, command: LightCommand, now: I) -> Result<(), LightsError> {
        match command {
            LightCommand::InitiateStart => self.initiate_start_sequence(),
            LightCommand::Reset => {
                self.reset_lights();
                Ok(())
            }
            LightCommand::FaultLight { dog, state } => {
                self.toggle_fault_light(dog, state, now).map(|_| ())
            }
            LightCommand::SetLight { light, state } => {
                self.set_light_state(light, state);
                Ok(())
            }
        }
    }

    /// Advances the scheduler by one tick.
    ///
    /// Runs the choreographer, drains every deadline reached by `now`, then
    /// flushes the mask. Returns `true` when the driver was written.
    pub fn tick<R>(&mut self, now: I, race: &mut R) -> bool
    where
        R: RaceTimer<I> + ?Sized,
    {
        if core::mem::take(&mut self.reset_pending) {
            self.telemetry.record(
                TelemetryEventKind::LightsReset,
                TelemetryPayload::none(),
                now,
            );
        }

        self.run_choreographer(now, race);
        self.drain_schedule(now);
        self.flush(now)
    }

    fn run_choreographer<R>(&mut self, now: I, race: &mut R)
    where
        R: RaceTimer<I> + ?Sized,
    {
        if self.overall != OverallState::Starting {
            return;
        }

        if self.session.is_none() {
            self.template.schedule_into(&mut self.schedule, now);
            self.session = Some(SequenceSession {
                armed_at: now,
                timers_signalled: false,
            });
            self.telemetry.record(
                TelemetryEventKind::SequenceArmed,
                TelemetryPayload::none(),
                now,
            );
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        if !session.timers_signalled
            && self.pending.contains(self.template.go_light)
            && race.is_starting()
        {
            race.start_timers(now);
            session.timers_signalled = true;
            self.telemetry.record(
                TelemetryEventKind::TimersStarted,
                TelemetryPayload::none(),
                now,
            );
        }

        // Any pending deadline keeps the sequence busy, fault flashes included.
        if self.schedule.is_idle() {
            let armed_at = session.armed_at;
            self.session = None;
            self.overall = OverallState::Started;
            self.telemetry.record_sequence_complete(Some(armed_at), now);
        }
    }

    fn drain_schedule(&mut self, now: I) {
        let pending = &mut self.pending;
        self.schedule.drain(now, |action| {
            *pending = if action.on {
                pending.with(action.light)
            } else {
                pending.without(action.light)
            };
        });
    }

    fn flush(&mut self, now: I) -> bool {
        if self.pending == self.applied {
            return false;
        }

        let previous = self.applied;
        self.driver.write_mask(self.pending);
        self.applied = self.pending;
        self.telemetry.record_output(previous, self.applied, now);
        true
    }
}
