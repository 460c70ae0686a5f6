use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};

use crate::hw::ShiftRegister;
use crate::lights::CommandChannel;
use crate::race::RaceHandler;

mod console_task;
mod lights_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static COMMAND_QUEUE: CommandChannel = CommandChannel::new();
pub(super) static RACE: RaceHandler = RaceHandler::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PB0,
        PB1,
        PB3,
        PB4,
        PB5,
        USART5,
        ..
    } = hal::init(config);

    let lights = ShiftRegister::new(
        Output::new(PB5, Level::Low, Speed::Low),
        Output::new(PB4, Level::Low, Speed::Low),
        Output::new(PB3, Level::Low, Speed::Low),
    );
    defmt::info!("lights: shift register ready latch=PB5 clock=PB4 data=PB3");

    spawner
        .spawn(lights_task::run(lights, COMMAND_QUEUE.receiver(), &RACE))
        .expect("failed to spawn lights task");

    spawner
        .spawn(console_task::run(
            COMMAND_QUEUE.sender(),
            &RACE,
            USART5,
            PB0,
            PB1,
        ))
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
