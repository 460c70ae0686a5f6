use embassy_futures::select::{Either, select};
use embassy_stm32::gpio::Output;
use embassy_time::Ticker;
use lights_core::controller::{LightCommand, LightScheduler};
use lights_core::repl::status::StatusSnapshot;

use crate::hw::ShiftRegister;
use crate::lights::{CommandReceiver, FirmwareInstant, TICK_PERIOD, mirror_telemetry};
use crate::race::RaceHandler;
use crate::status;

type Scheduler = LightScheduler<ShiftRegister<Output<'static>>, FirmwareInstant>;

#[embassy_executor::task]
pub async fn run(
    driver: ShiftRegister<Output<'static>>,
    commands: CommandReceiver<'static>,
    race: &'static RaceHandler,
) -> ! {
    let mut lights: Scheduler = LightScheduler::new(driver);
    let mut race = race;
    let mut ticker = Ticker::every(TICK_PERIOD);
    let mut cursor = lights.telemetry().next_id();

    loop {
        match select(ticker.next(), commands.receive()).await {
            Either::First(()) => {
                lights.tick(FirmwareInstant::now(), &mut race);
                status::publish(StatusSnapshot::capture(&lights));
            }
            Either::Second(command) => apply(&mut lights, race, command),
        }

        cursor = mirror_telemetry(lights.telemetry(), cursor);
    }
}

fn apply(lights: &mut Scheduler, race: &RaceHandler, command: LightCommand) {
    match command {
        LightCommand::InitiateStart => race.begin_start(),
        LightCommand::Reset => race.stop(),
        LightCommand::FaultLight { .. } | LightCommand::SetLight { .. } => {}
    }

    if let Err(err) = lights.apply_command(command, FirmwareInstant::now()) {
        defmt::warn!(
            "lights: command rejected: {}",
            defmt::Display2Format(&err)
        );
    }
}
