//! Deferred on/off deadlines for each light slot.
//!
//! The table is drained once per tick. A slot holds at most one pending
//! turn-on and one pending turn-off deadline; writing a new deadline replaces
//! the old one, which is how a re-triggered fault flash restarts its window.

use crate::lights::{LIGHT_COUNT, Light};

/// Number of schedule slots, one per physical light by default.
pub const SCHEDULE_SLOT_COUNT: usize = LIGHT_COUNT;

/// Identifier for a row of the schedule table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleSlot {
    White,
    Red,
    Yellow1,
    Blue,
    Yellow2,
    Green,
    Yellow3,
}

impl ScheduleSlot {
    /// Every slot in drain order.
    pub const ALL: [ScheduleSlot; SCHEDULE_SLOT_COUNT] = [
        ScheduleSlot::White,
        ScheduleSlot::Red,
        ScheduleSlot::Yellow1,
        ScheduleSlot::Blue,
        ScheduleSlot::Yellow2,
        ScheduleSlot::Green,
        ScheduleSlot::Yellow3,
    ];

    /// Deterministic index into the table.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            ScheduleSlot::White => 0,
            ScheduleSlot::Red => 1,
            ScheduleSlot::Yellow1 => 2,
            ScheduleSlot::Blue => 3,
            ScheduleSlot::Yellow2 => 4,
            ScheduleSlot::Green => 5,
            ScheduleSlot::Yellow3 => 6,
        }
    }

    /// Light a slot drives until a caller points it elsewhere.
    #[must_use]
    pub const fn default_light(self) -> Light {
        match self {
            ScheduleSlot::White => Light::White,
            ScheduleSlot::Red => Light::Red,
            ScheduleSlot::Yellow1 => Light::Yellow1,
            ScheduleSlot::Blue => Light::Blue,
            ScheduleSlot::Yellow2 => Light::Yellow2,
            ScheduleSlot::Green => Light::Green,
            ScheduleSlot::Yellow3 => Light::Yellow3,
        }
    }
}

/// Pending deadlines for one slot. `None` means nothing is pending.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScheduleEntry<I> {
    pub light: Light,
    pub turn_on_at: Option<I>,
    pub turn_off_at: Option<I>,
}

impl<I> ScheduleEntry<I> {
    const fn idle(light: Light) -> Self {
        Self {
            light,
            turn_on_at: None,
            turn_off_at: None,
        }
    }

    /// Returns `true` when either deadline is still pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.turn_on_at.is_some() || self.turn_off_at.is_some()
    }
}

/// Action emitted while draining the table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScheduledAction {
    pub slot: ScheduleSlot,
    pub light: Light,
    pub on: bool,
}

/// Fixed-size table of per-slot deadlines.
#[derive(Clone, Debug)]
pub struct ScheduleTable<I> {
    entries: [ScheduleEntry<I>; SCHEDULE_SLOT_COUNT],
}

impl<I> ScheduleTable<I>
where
    I: Copy + Ord,
{
    /// Creates a table with nothing scheduled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [
                ScheduleEntry::idle(Light::White),
                ScheduleEntry::idle(Light::Red),
                ScheduleEntry::idle(Light::Yellow1),
                ScheduleEntry::idle(Light::Blue),
                ScheduleEntry::idle(Light::Yellow2),
                ScheduleEntry::idle(Light::Green),
                ScheduleEntry::idle(Light::Yellow3),
            ],
        }
    }

    /// Returns the entry stored for `slot`.
    #[must_use]
    pub fn entry(&self, slot: ScheduleSlot) -> &ScheduleEntry<I> {
        &self.entries[slot.as_index()]
    }

    /// Schedules `light` to turn on at `at`, replacing any pending turn-on.
    pub fn schedule_on(&mut self, slot: ScheduleSlot, light: Light, at: I) {
        let entry = &mut self.entries[slot.as_index()];
        entry.light = light;
        entry.turn_on_at = Some(at);
    }

    /// Schedules `light` to turn off at `at`, replacing any pending turn-off.
    pub fn schedule_off(&mut self, slot: ScheduleSlot, light: Light, at: I) {
        let entry = &mut self.entries[slot.as_index()];
        entry.light = light;
        entry.turn_off_at = Some(at);
    }

    /// Drops every pending deadline. Lights keep their current state.
    pub fn clear_all(&mut self) {
        for entry in &mut self.entries {
            entry.turn_on_at = None;
            entry.turn_off_at = None;
        }
    }

    /// Returns `true` when no slot has a pending deadline.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.entries.iter().any(ScheduleEntry::is_pending)
    }

    /// Number of slots that still hold a pending deadline.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_pending()).count()
    }

    /// Fires every deadline reached by `now`, in slot order.
    ///
    /// Within one slot the turn-on is applied before the turn-off, so a slot
    /// whose two deadlines have both passed ends up off. Each fired deadline
    /// is cleared before `apply` runs so it can never fire twice.
    pub fn drain<F>(&mut self, now: I, mut apply: F)
    where
        F: FnMut(ScheduledAction),
    {
        for slot in ScheduleSlot::ALL {
            let entry = &mut self.entries[slot.as_index()];
            let light = entry.light;

            if let Some(deadline) = entry.turn_on_at
                && now >= deadline
            {
                entry.turn_on_at = None;
                apply(ScheduledAction {
                    slot,
                    light,
                    on: true,
                });
            }

            if let Some(deadline) = entry.turn_off_at
                && now >= deadline
            {
                entry.turn_off_at = None;
                apply(ScheduledAction {
                    slot,
                    light,
                    on: false,
                });
            }
        }
    }
}

impl<I> Default for ScheduleTable<I>
where
    I: Copy + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}
