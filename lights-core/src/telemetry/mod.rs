//! Telemetry event catalog and ring buffer shared by firmware and host targets.
//!
//! The scheduler records every observable change here instead of logging
//! directly, so the core stays `no_std` and silent. Firmware mirrors new
//! records to `defmt`; the emulator prints them. Event kinds encode to compact
//! numeric codes for transport over diagnostics channels.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::lights::{Light, LightMask, LightState};

/// Identifier assigned to each telemetry record. Wraps on overflow.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events emitted by the light scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    LightOn(Light),
    LightOff(Light),
    OutputApplied,
    SequenceArmed,
    TimersStarted,
    SequenceComplete,
    /// Fault light raised or cleared for the zero-based dog index.
    FaultLight(u8),
    LightsReset,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::LightOn(light) => write!(f, "light-on {light}"),
            TelemetryEventKind::LightOff(light) => write!(f, "light-off {light}"),
            TelemetryEventKind::OutputApplied => f.write_str("output-applied"),
            TelemetryEventKind::SequenceArmed => f.write_str("sequence-armed"),
            TelemetryEventKind::TimersStarted => f.write_str("timers-started"),
            TelemetryEventKind::SequenceComplete => f.write_str("sequence-complete"),
            TelemetryEventKind::FaultLight(dog) => write!(f, "fault-light dog{dog}"),
            TelemetryEventKind::LightsReset => f.write_str("lights-reset"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const LIGHT_ON_BASE: u16 = 0x0000;
    const LIGHT_OFF_BASE: u16 = 0x0008;
    const OUTPUT_APPLIED_CODE: u16 = 0x0010;
    const SEQUENCE_ARMED_CODE: u16 = 0x0011;
    const TIMERS_STARTED_CODE: u16 = 0x0012;
    const SEQUENCE_COMPLETE_CODE: u16 = 0x0013;
    const LIGHTS_RESET_CODE: u16 = 0x0014;
    const FAULT_LIGHT_BASE: u16 = 0x0018;
    const FAULT_LIGHT_END: u16 = 0x001C;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::LightOn(light) => Self::LIGHT_ON_BASE + light_offset(light),
            TelemetryEventKind::LightOff(light) => Self::LIGHT_OFF_BASE + light_offset(light),
            TelemetryEventKind::OutputApplied => Self::OUTPUT_APPLIED_CODE,
            TelemetryEventKind::SequenceArmed => Self::SEQUENCE_ARMED_CODE,
            TelemetryEventKind::TimersStarted => Self::TIMERS_STARTED_CODE,
            TelemetryEventKind::SequenceComplete => Self::SEQUENCE_COMPLETE_CODE,
            TelemetryEventKind::LightsReset => Self::LIGHTS_RESET_CODE,
            TelemetryEventKind::FaultLight(dog) => Self::FAULT_LIGHT_BASE + dog as u16,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant into a telemetry event, falling back to [`Custom`].
    ///
    /// [`Custom`]: TelemetryEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::OUTPUT_APPLIED_CODE => TelemetryEventKind::OutputApplied,
            Self::SEQUENCE_ARMED_CODE => TelemetryEventKind::SequenceArmed,
            Self::TIMERS_STARTED_CODE => TelemetryEventKind::TimersStarted,
            Self::SEQUENCE_COMPLETE_CODE => TelemetryEventKind::SequenceComplete,
            Self::LIGHTS_RESET_CODE => TelemetryEventKind::LightsReset,
            value if (Self::LIGHT_ON_BASE..Self::LIGHT_OFF_BASE).contains(&value) => {
                light_from_offset(value - Self::LIGHT_ON_BASE)
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::LightOn)
            }
            value if (Self::LIGHT_OFF_BASE..Self::OUTPUT_APPLIED_CODE).contains(&value) => {
                light_from_offset(value - Self::LIGHT_OFF_BASE)
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::LightOff)
            }
            value if (Self::FAULT_LIGHT_BASE..Self::FAULT_LIGHT_END).contains(&value) => {
                u8::try_from(value - Self::FAULT_LIGHT_BASE)
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::FaultLight)
            }
            other => TelemetryEventKind::Custom(other),
        }
    }

    /// Returns `true` for events that usually deserve operator attention.
    #[must_use]
    pub const fn is_notable(self) -> bool {
        matches!(
            self,
            TelemetryEventKind::FaultLight(_)
                | TelemetryEventKind::LightsReset
                | TelemetryEventKind::TimersStarted
        )
    }
}

const fn light_offset(light: Light) -> u16 {
    match light {
        Light::White => 0,
        Light::Red => 1,
        Light::Yellow1 => 2,
        Light::Blue => 3,
        Light::Yellow2 => 4,
        Light::Green => 5,
        Light::Yellow3 => 6,
    }
}

fn light_from_offset(offset: u16) -> Option<Light> {
    Light::from_index(usize::from(offset))
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Output mask before and after a flush.
    Mask {
        previous: LightMask,
        current: LightMask,
    },
    /// Elapsed time since the start sequence armed.
    Sequence { duration: Option<Duration> },
    /// Fault light and the state requested for it.
    Fault { light: Light, state: LightState },
}

impl TelemetryPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Mask { previous, current } => {
                write!(f, "mask {previous} -> {current}")
            }
            TelemetryPayload::Sequence {
                duration: Some(duration),
            } => write!(f, "after {}ms", duration.as_millis()),
            TelemetryPayload::Sequence { duration: None } => Ok(()),
            TelemetryPayload::Fault { light, state } => write!(f, "{light} {state}"),
        }
    }
}

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Offsets from an arbitrary epoch double as instants on host builds.
impl TelemetryInstant for Duration {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.saturating_sub(earlier)
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next record will receive.
    #[must_use]
    pub fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Iterates, oldest first, over retained records whose id is at or after `cursor`.
    ///
    /// Consumers keep the cursor returned by [`next_id`](Self::next_id) after
    /// each pass so a record is only mirrored once. Records already evicted
    /// from the ring are skipped silently.
    pub fn since(&self, cursor: EventId) -> impl Iterator<Item = &TelemetryRecord<TInstant>> {
        let behind = self.next_event_id.wrapping_sub(cursor);
        self.oldest_first()
            .filter(move |record| self.next_event_id.wrapping_sub(record.id) <= behind)
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    /// Records the per-light transitions and the applied mask for one flush.
    pub fn record_output(
        &mut self,
        previous: LightMask,
        current: LightMask,
        timestamp: TInstant,
    ) -> EventId {
        let changed = LightMask::from_bits(previous.bits() ^ current.bits());
        for light in changed.lit() {
            let event = if current.contains(light) {
                TelemetryEventKind::LightOn(light)
            } else {
                TelemetryEventKind::LightOff(light)
            };
            self.record(event, TelemetryPayload::none(), timestamp);
        }

        self.record(
            TelemetryEventKind::OutputApplied,
            TelemetryPayload::Mask { previous, current },
            timestamp,
        )
    }

    /// Records the end of a start sequence, with its run time when known.
    pub fn record_sequence_complete(
        &mut self,
        armed_at: Option<TInstant>,
        timestamp: TInstant,
    ) -> EventId {
        let duration = armed_at.map(|start| timestamp.saturating_duration_since(start));
        self.record(
            TelemetryEventKind::SequenceComplete,
            TelemetryPayload::Sequence { duration },
            timestamp,
        )
    }

    /// Records a fault light request for `dog`.
    pub fn record_fault(
        &mut self,
        dog: usize,
        light: Light,
        state: LightState,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::FaultLight(truncate_dog(dog)),
            TelemetryPayload::Fault { light, state },
            timestamp,
        )
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_dog(dog: usize) -> u8 {
    match u8::try_from(dog) {
        Ok(value) => value,
        Err(_) => u8::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MillisInstant(u64);

    impl TelemetryInstant for MillisInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn event_kind_round_trip() {
        let fixtures = [
            (TelemetryEventKind::LightOn(Light::White), 0x0000),
            (TelemetryEventKind::LightOn(Light::Yellow3), 0x0006),
            (TelemetryEventKind::LightOff(Light::Green), 0x000D),
            (TelemetryEventKind::OutputApplied, 0x0010),
            (TelemetryEventKind::LightsReset, 0x0014),
            (TelemetryEventKind::FaultLight(3), 0x001B),
        ];

        for (event, code) in fixtures {
            assert_eq!(event.to_raw(), code);
            assert_eq!(TelemetryEventKind::from_raw(code), event);
        }

        // Gaps in the code space decode as custom events.
        assert_eq!(
            TelemetryEventKind::from_raw(0x0007),
            TelemetryEventKind::Custom(0x0007)
        );
        assert_eq!(
            TelemetryEventKind::from_raw(0x001C),
            TelemetryEventKind::Custom(0x001C)
        );
    }

    #[test]
    fn output_records_one_event_per_changed_light() {
        let mut recorder = TelemetryRecorder::<MillisInstant>::new();
        let previous = LightMask::EMPTY.with(Light::Red).with(Light::White);
        let current = LightMask::EMPTY.with(Light::Red).with(Light::Green);

        let id = recorder.record_output(previous, current, MillisInstant(40));
        assert_eq!(id, 2);

        let events: heapless::Vec<TelemetryEventKind, 4> =
            recorder.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            &[
                TelemetryEventKind::LightOff(Light::White),
                TelemetryEventKind::LightOn(Light::Green),
                TelemetryEventKind::OutputApplied,
            ]
        );

        let latest = recorder.latest().copied().unwrap();
        assert_eq!(
            latest.details,
            TelemetryPayload::Mask { previous, current }
        );
    }

    #[test]
    fn sequence_complete_carries_run_time() {
        let mut recorder = TelemetryRecorder::<MillisInstant>::new();
        recorder.record_sequence_complete(Some(MillisInstant(1_000)), MillisInstant(5_010));

        match recorder.latest().map(|record| record.details) {
            Some(TelemetryPayload::Sequence {
                duration: Some(duration),
            }) => assert_eq!(duration.as_millis(), 4_010),
            other => panic!("unexpected payload {other:?}"),
        }

        recorder.record_sequence_complete(None, MillisInstant(6_000));
        assert_eq!(
            recorder.latest().map(|record| record.details),
            Some(TelemetryPayload::Sequence { duration: None })
        );
    }

    #[test]
    fn since_skips_records_already_seen() {
        let mut recorder = TelemetryRecorder::<MillisInstant, 4>::new();
        recorder.record(
            TelemetryEventKind::SequenceArmed,
            TelemetryPayload::none(),
            MillisInstant(0),
        );
        let cursor = recorder.next_id();

        for at in 1..=5 {
            recorder.record(
                TelemetryEventKind::Custom(u16::try_from(at).unwrap()),
                TelemetryPayload::none(),
                MillisInstant(at),
            );
        }

        // Capacity four keeps ids 2..=5; id 1 was evicted.
        let ids: heapless::Vec<EventId, 4> = recorder.since(cursor).map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);

        let cursor = recorder.next_id();
        assert_eq!(recorder.since(cursor).count(), 0);
    }

    #[test]
    fn fault_record_keeps_light_and_state() {
        let mut recorder = TelemetryRecorder::<MillisInstant>::new();
        recorder.record_fault(2, Light::Yellow2, LightState::On, MillisInstant(7));

        let record = recorder.latest().copied().unwrap();
        assert_eq!(record.event, TelemetryEventKind::FaultLight(2));
        assert!(record.event.is_notable());
        assert_eq!(
            record.details,
            TelemetryPayload::Fault {
                light: Light::Yellow2,
                state: LightState::On
            }
        );
    }
}
