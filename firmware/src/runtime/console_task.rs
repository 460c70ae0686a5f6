use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;

use crate::console::{ConsoleSession, MAX_LINE_LEN, Reply};
use crate::lights::{ChannelQueue, CommandSender};
use crate::race::RaceHandler;

const CONSOLE_UART_BAUD: u32 = 115_200;
const CONSOLE_BUFFER_SIZE: usize = MAX_LINE_LEN * 2;
const BANNER: &[u8] = b"flyball lights ready, type `help`\n";

static UART_TX_BUFFER: StaticCell<[u8; CONSOLE_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; CONSOLE_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    commands: CommandSender<'static>,
    race: &'static RaceHandler,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = CONSOLE_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; CONSOLE_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; CONSOLE_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize console UART");

    let (mut uart_tx, mut uart_rx) = uart.split();
    let mut session = ConsoleSession::new(ChannelQueue::new(commands));
    let mut reply = Reply::new();
    let mut ingress = [0u8; MAX_LINE_LEN];

    write_all(&mut uart_tx, BANNER).await;
    defmt::info!("console: USART5 ready baud={}", CONSOLE_UART_BAUD);

    loop {
        let count = match uart_rx.read(&mut ingress).await {
            Ok(count) => count,
            Err(_) => {
                defmt::warn!("console: UART read error");
                Timer::after(Duration::from_millis(5)).await;
                continue;
            }
        };

        for &byte in &ingress[..count] {
            match session.ingest(byte, &mut reply) {
                Ok(true) => {
                    write_all(&mut uart_tx, reply.as_bytes()).await;
                    log_race(race);
                }
                Ok(false) => {}
                Err(err) => {
                    defmt::warn!("console: {}", defmt::Display2Format(&err));
                    reply.clear();
                    let _ = core::fmt::Write::write_fmt(&mut reply, format_args!("{err}\n"));
                    write_all(&mut uart_tx, reply.as_bytes()).await;
                }
            }
        }
    }
}

async fn write_all<W: Write>(uart_tx: &mut W, data: &[u8]) {
    if uart_tx.write_all(data).await.is_err() || uart_tx.flush().await.is_err() {
        defmt::warn!("console: UART write error");
    }
}

fn log_race(race: &RaceHandler) {
    match race.started_at_micros() {
        Some(started) => defmt::debug!(
            "console: race {} started t={}us",
            defmt::Display2Format(&race.state()),
            started
        ),
        None => defmt::debug!("console: race {}", defmt::Display2Format(&race.state())),
    }
}
