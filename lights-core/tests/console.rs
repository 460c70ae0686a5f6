use core::fmt::Write;
use core::time::Duration;

use heapless::String;
use lights_core::controller::{
    LightCommand, LightCommandBuffer, LightScheduler, LightsError, NoopLightDriver, OverallState,
};
use lights_core::lights::{Light, LightState};
use lights_core::race::SimpleRace;
use lights_core::repl::catalog;
use lights_core::repl::commands::{CommandError, CommandExecutor, CommandOutcome};
use lights_core::repl::status::StatusSnapshot;

const TICK: Duration = Duration::from_millis(10);

struct Bench {
    executor: CommandExecutor<LightCommandBuffer>,
    lights: LightScheduler<NoopLightDriver, Duration>,
    race: SimpleRace<Duration>,
    now: Duration,
}

impl Bench {
    fn new() -> Self {
        Self {
            executor: CommandExecutor::with_virtual_clock(LightCommandBuffer::new()),
            lights: LightScheduler::new(NoopLightDriver::new()),
            race: SimpleRace::new(),
            now: Duration::ZERO,
        }
    }

    /// Runs one console line the way a front-end would.
    fn run(&mut self, line: &str) -> Result<(), LightsError> {
        match self.executor.execute(line) {
            Ok(CommandOutcome::Wait(duration)) => {
                let until = self.now + duration;
                while self.now < until {
                    self.step()?;
                }
                Ok(())
            }
            Ok(_) => self.step(),
            Err(CommandError::Rejected(err)) => Err(err),
            Err(other) => panic!("unexpected console error for `{line}`: {other:?}"),
        }
    }

    fn step(&mut self) -> Result<(), LightsError> {
        while let Some(command) = self.executor.queue_mut().pop() {
            if command == LightCommand::InitiateStart {
                self.race.begin_start();
            }
            self.lights.apply_command(command, self.now)?;
        }
        self.lights.tick(self.now, &mut self.race);
        self.now += TICK;
        Ok(())
    }

    fn status(&self) -> String<96> {
        let mut out = String::new();
        write!(out, "{}", StatusSnapshot::capture(&self.lights)).expect("status fits");
        out
    }
}

#[test]
fn scripted_race_start_reaches_started() {
    let mut bench = Bench::new();

    bench.run("start").expect("start accepted");
    assert_eq!(
        bench.status().as_str(),
        "state STARTING sequence=active\nlights 0x02 yellow3"
    );

    bench.run("wait 3100ms").expect("wait");
    assert_eq!(bench.lights.check_light_state(Light::Green), LightState::On);
    assert!(bench.race.started_at().is_some(), "timers start on green");

    bench.run("wait 1s").expect("wait");
    assert_eq!(bench.lights.overall_state(), OverallState::Started);
    assert_eq!(
        bench.status().as_str(),
        "state STARTED sequence=idle\nlights 0x00 (all off)"
    );

    assert_eq!(bench.run("start"), Err(LightsError::ResetRequired));
    bench.run("reset").expect("reset");
    bench.run("start").expect("start after reset");
    assert_eq!(bench.lights.overall_state(), OverallState::Starting);
}

#[test]
fn fault_command_flashes_white_through_the_queue() {
    let mut bench = Bench::new();

    bench.run("fault 1").expect("dog 1");
    assert_eq!(bench.lights.check_light_state(Light::Blue), LightState::On);
    assert_eq!(bench.lights.check_light_state(Light::White), LightState::On);

    bench.run("wait 1s").expect("wait");
    assert_eq!(bench.lights.check_light_state(Light::White), LightState::Off);

    bench.run("fault 1 off").expect("dog 1 off");
    assert_eq!(bench.lights.check_light_state(Light::Blue), LightState::Off);
}

#[test]
fn bad_dog_never_reaches_the_scheduler() {
    let mut executor = CommandExecutor::new(LightCommandBuffer::<4>::new());
    assert_eq!(
        executor.execute("fault 7"),
        Err(CommandError::Rejected(LightsError::InvalidDogIndex(7)))
    );
    assert_eq!(executor.queue_mut().pop(), None);
}

#[test]
fn help_topics_render_from_the_catalog() {
    let mut executor = CommandExecutor::new(LightCommandBuffer::<4>::new());
    let Ok(CommandOutcome::Help(topic)) = executor.execute("help fault") else {
        panic!("help should be handled locally");
    };

    let mut out = String::<256>::new();
    catalog::write_help(&mut out, topic).expect("help fits");
    assert!(out.starts_with("usage: fault <dog> [on|off|toggle]"));
}
