#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Light control surface bridging firmware tasks with `lights-core`.
//!
//! Owns the firmware instant type, the command channel shared by the console
//! and the lights task, and the telemetry mirror that forwards scheduler
//! records to defmt (or stdout on host builds).

use core::ops::Add;
use core::time::Duration as CoreDuration;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embassy_time::{Duration, Instant};
use lights_core::controller::{
    CommandEnqueueError, LIGHT_COMMAND_QUEUE_DEPTH, LightCommand, LightCommandQueue,
};
use lights_core::telemetry::{EventId, TelemetryInstant, TelemetryRecord, TelemetryRecorder};

/// Period of the lights task ticker.
pub const TICK_PERIOD: Duration = Duration::from_millis(10);

#[cfg(target_os = "none")]
type LightsMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type LightsMutex = NoopRawMutex;

/// Queue carrying console requests to the lights task.
pub type CommandChannel = Channel<LightsMutex, LightCommand, LIGHT_COMMAND_QUEUE_DEPTH>;

/// Convenience sender type alias for the light command queue.
pub type CommandSender<'a> = Sender<'a, LightsMutex, LightCommand, LIGHT_COMMAND_QUEUE_DEPTH>;

/// Convenience receiver type alias for the light command queue.
pub type CommandReceiver<'a> = Receiver<'a, LightsMutex, LightCommand, LIGHT_COMMAND_QUEUE_DEPTH>;

/// Embassy instant wrapped so it can satisfy the `lights-core` clock traits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Reads the embassy time driver.
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<CoreDuration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: CoreDuration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        self.0
            .checked_add(Duration::from_micros(micros))
            .map_or(Self(Instant::MAX), Self)
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> CoreDuration {
        let elapsed = self.0.saturating_duration_since(earlier.0);
        CoreDuration::from_micros(elapsed.as_micros())
    }
}

/// Adapter that lets the console executor push into the embassy channel.
pub struct ChannelQueue<'a> {
    sender: CommandSender<'a>,
}

impl<'a> ChannelQueue<'a> {
    pub fn new(sender: CommandSender<'a>) -> Self {
        Self { sender }
    }
}

impl LightCommandQueue for ChannelQueue<'_> {
    type Error = TrySendError<LightCommand>;

    fn try_enqueue(
        &mut self,
        command: LightCommand,
    ) -> Result<(), CommandEnqueueError<Self::Error>> {
        match self.sender.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(CommandEnqueueError::QueueFull),
        }
    }
}

/// Logs every record newer than `cursor` and returns the next cursor.
pub fn mirror_telemetry<const CAPACITY: usize>(
    telemetry: &TelemetryRecorder<FirmwareInstant, CAPACITY>,
    cursor: EventId,
) -> EventId {
    for record in telemetry.since(cursor) {
        log_record(record);
    }
    telemetry.next_id()
}

#[cfg(target_os = "none")]
fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    if record.event.is_notable() {
        defmt::info!(
            "lights:{} {} t={}us",
            defmt::Display2Format(&record.event),
            defmt::Display2Format(&record.details),
            record.timestamp.as_micros()
        );
    } else {
        defmt::debug!(
            "lights:{} {} t={}us",
            defmt::Display2Format(&record.event),
            defmt::Display2Format(&record.details),
            record.timestamp.as_micros()
        );
    }
}

#[cfg(not(target_os = "none"))]
fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    println!(
        "lights:{} {} t={}us",
        record.event,
        record.details,
        record.timestamp.as_micros()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lights_core::lights::{Light, LightState};
    use lights_core::telemetry::{TelemetryEventKind, TelemetryPayload};

    fn millis(value: u64) -> FirmwareInstant {
        FirmwareInstant::from(Instant::from_millis(value))
    }

    #[test]
    fn instant_adds_core_durations() {
        let later = millis(250) + CoreDuration::from_millis(1_000);
        assert_eq!(later, millis(1_250));
        assert_eq!(
            later.saturating_duration_since(millis(250)),
            CoreDuration::from_millis(1_000)
        );
        assert_eq!(
            millis(0).saturating_duration_since(later),
            CoreDuration::ZERO
        );
    }

    #[test]
    fn instant_addition_saturates() {
        let end = FirmwareInstant::from(Instant::MAX) + CoreDuration::from_secs(1);
        assert_eq!(end.into_embassy(), Instant::MAX);
    }

    #[test]
    fn channel_queue_reports_full() {
        let channel = CommandChannel::new();
        let mut queue = ChannelQueue::new(channel.sender());

        for _ in 0..LIGHT_COMMAND_QUEUE_DEPTH {
            queue
                .try_enqueue(LightCommand::Reset)
                .expect("queue has room");
        }

        assert!(matches!(
            queue.try_enqueue(LightCommand::InitiateStart),
            Err(CommandEnqueueError::QueueFull)
        ));
        assert!(matches!(channel.try_receive(), Ok(LightCommand::Reset)));
    }

    #[test]
    fn mirror_advances_cursor_past_logged_records() {
        let mut telemetry = TelemetryRecorder::<FirmwareInstant, 8>::new();
        telemetry.record_fault(0, Light::Red, LightState::On, millis(5));
        let cursor = mirror_telemetry(&telemetry, 0);
        assert_eq!(cursor, 1);

        telemetry.record(
            TelemetryEventKind::LightsReset,
            TelemetryPayload::none(),
            millis(6),
        );
        assert_eq!(telemetry.since(cursor).count(), 1);
        assert_eq!(mirror_telemetry(&telemetry, cursor), 2);
    }
}
