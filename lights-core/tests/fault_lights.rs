use core::ops::Add;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use lights_core::controller::{FAULT_FLASH_DURATION, LightDriver, LightScheduler, LightsError};
use lights_core::lights::{DOG_FAULT_LIGHTS, Light, LightMask, LightState};
use lights_core::race::NoopRaceTimer;
use lights_core::telemetry::{TelemetryEventKind, TelemetryInstant, TelemetryPayload};

#[test]
fn each_dog_maps_to_its_own_light() {
    for (dog, expected) in DOG_FAULT_LIGHTS.iter().copied().enumerate() {
        let mut lights = build_scheduler();
        let light = lights
            .toggle_fault_light(dog, LightState::On, MockInstant(0))
            .expect("dogs 0-3 are wired");

        assert_eq!(light, expected);
        assert_eq!(
            lights.check_light_state(expected),
            LightState::On,
            "fault light for dog {dog} should change before any tick"
        );
        assert_eq!(lights.check_light_state(Light::White), LightState::Off);
    }
}

#[test]
fn raising_a_fault_flashes_white_for_one_second() {
    let mut lights = build_scheduler();
    let mut race = NoopRaceTimer;

    lights
        .toggle_fault_light(2, LightState::On, MockInstant(100))
        .expect("dog 2 is wired");

    lights.tick(MockInstant(100), &mut race);
    assert_eq!(
        lights.applied_mask(),
        LightMask::EMPTY.with(Light::Yellow2).with(Light::White)
    );

    lights.tick(MockInstant(1_099), &mut race);
    assert_eq!(lights.check_light_state(Light::White), LightState::On);

    lights.tick(MockInstant(100) + FAULT_FLASH_DURATION, &mut race);
    assert_eq!(lights.check_light_state(Light::White), LightState::Off);
    assert_eq!(
        lights.check_light_state(Light::Yellow2),
        LightState::On,
        "fault light stays up after the flash"
    );
    assert!(lights.schedule().is_idle());
}

#[test]
fn second_fault_restarts_the_flash_window() {
    let mut lights = build_scheduler();
    let mut race = NoopRaceTimer;

    lights
        .toggle_fault_light(0, LightState::On, MockInstant(0))
        .expect("dog 0 is wired");
    lights.tick(MockInstant(0), &mut race);

    lights
        .toggle_fault_light(1, LightState::On, MockInstant(500))
        .expect("dog 1 is wired");
    lights.tick(MockInstant(500), &mut race);

    lights.tick(MockInstant(1_000), &mut race);
    assert_eq!(
        lights.check_light_state(Light::White),
        LightState::On,
        "first window must not switch white off early"
    );

    lights.tick(MockInstant(1_499), &mut race);
    assert_eq!(lights.check_light_state(Light::White), LightState::On);

    lights.tick(MockInstant(2_500), &mut race);
    assert_eq!(lights.check_light_state(Light::White), LightState::Off);
    assert_eq!(
        lights.applied_mask(),
        LightMask::EMPTY.with(Light::Red).with(Light::Blue)
    );
}

#[test]
fn clearing_a_fault_leaves_white_alone() {
    let mut lights = build_scheduler();
    let mut race = NoopRaceTimer;

    lights.set_light_state(Light::Green, LightState::On);
    lights.tick(MockInstant(0), &mut race);

    lights
        .toggle_fault_light(3, LightState::Off, MockInstant(10))
        .expect("dog 3 is wired");
    assert!(lights.schedule().is_idle());

    lights.tick(MockInstant(20), &mut race);
    assert!(lights.applied_mask().is_empty());
    assert_eq!(
        lights.driver().writes.as_slice(),
        &[LightMask::from_bits(0x04), LightMask::EMPTY]
    );
}

#[test]
fn toggle_fault_follows_the_fault_light() {
    let mut lights = build_scheduler();

    lights
        .toggle_fault_light(1, LightState::Toggle, MockInstant(0))
        .expect("dog 1 is wired");
    assert_eq!(lights.check_light_state(Light::Blue), LightState::On);
    assert!(
        lights.schedule().is_idle(),
        "only an explicit on request flashes white"
    );

    lights
        .toggle_fault_light(1, LightState::Toggle, MockInstant(10))
        .expect("dog 1 is wired");
    assert_eq!(lights.check_light_state(Light::Blue), LightState::Off);
}

#[test]
fn unknown_dog_is_rejected() {
    let mut lights = build_scheduler();

    for dog in [4, 5, usize::MAX] {
        assert_eq!(
            lights.toggle_fault_light(dog, LightState::On, MockInstant(0)),
            Err(LightsError::InvalidDogIndex(dog))
        );
    }

    lights.tick(MockInstant(0), &mut NoopRaceTimer);
    assert!(lights.driver().writes.is_empty());
    assert!(lights.telemetry().is_empty());
}

#[test]
fn fault_is_recorded_with_dog_and_light() {
    let mut lights = build_scheduler();
    lights
        .toggle_fault_light(2, LightState::On, MockInstant(42))
        .expect("dog 2 is wired");

    let record = lights.telemetry().latest().copied().expect("fault recorded");
    assert_eq!(record.event, TelemetryEventKind::FaultLight(2));
    assert_eq!(record.timestamp, MockInstant(42));
    assert_eq!(
        record.details,
        TelemetryPayload::Fault {
            light: Light::Yellow2,
            state: LightState::On
        }
    );
}

fn build_scheduler() -> LightScheduler<RecordingDriver, MockInstant> {
    LightScheduler::new(RecordingDriver::default())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).expect("duration fits in u64"))
    }
}

impl TelemetryInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Default)]
struct RecordingDriver {
    writes: HeaplessVec<LightMask, 32>,
}

impl LightDriver for RecordingDriver {
    fn write_mask(&mut self, mask: LightMask) {
        self.writes.push(mask).expect("driver log full");
    }
}
