//! FIT - Food Inventory Tracker firmware
//!
//! Buttons, barcode scanner and push-to-talk microphone on a Raspberry Pi
//! Pico. Two acquisition tasks hand finished artifacts to the confirmation
//! desk; the main task supervises.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use panic_halt as _;
use defmt_rtt as _;
use static_cell::{ConstStaticCell, StaticCell};

use fit_acquisition::board::{
    self, AdcAudio, Board, BoardMicrophone, BoardScanner, BoardState, Drivers, GpioLine, LogDisplay,
    LogInventory, Offline,
};
use fit_acquisition::client::HttpTranslator;
use fit_acquisition::config::{SystemConfig, RECORDING_CAPACITY};
use fit_acquisition::supervisor::AppSupervisor;
use fit_acquisition::workflow::{self, AppContext, ConfirmationDesk};
use fit_acquisition::{BarcodeScanner, Button, Buttons, Microphone};

type Desk = ConfirmationDesk<'static, GpioLine, LogDisplay, LogInventory, HttpTranslator<Offline>>;

// ===================================================================
// Static Drivers
// ===================================================================

static BOARD_STATE: BoardState = BoardState::new();
static BUTTONS: Buttons<GpioLine> = Buttons::new();
static SCANNER: StaticCell<BoardScanner> = StaticCell::new();
static MICROPHONE: StaticCell<BoardMicrophone> = StaticCell::new();
static DESK: StaticCell<Desk> = StaticCell::new();
static RECORDING: ConstStaticCell<[u32; RECORDING_CAPACITY]> =
    ConstStaticCell::new([0; RECORDING_CAPACITY]);
static EXPORT: ConstStaticCell<[u16; RECORDING_CAPACITY]> =
    ConstStaticCell::new([0; RECORDING_CAPACITY]);

// ===================================================================
// Tasks
// ===================================================================

#[embassy_executor::task]
async fn barcode_task(scanner: &'static BoardScanner, desk: &'static Desk) {
    workflow::barcode_loop(scanner, desk).await;
}

#[embassy_executor::task]
async fn microphone_task(
    microphone: &'static BoardMicrophone,
    desk: &'static Desk,
    export: &'static mut [u16; RECORDING_CAPACITY],
) {
    let reason = workflow::microphone_loop(microphone, desk, export).await;
    warn!("Microphone task exited: {}", reason);
}

/// Construction failure leaves nothing to supervise
fn halt() -> ! {
    error!("FIT initialization failed, halting");
    loop {
        cortex_m::asm::wfi();
    }
}

// ===================================================================
// Main Application Entry Point
// ===================================================================

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut supervisor = AppSupervisor::new();
    supervisor.print_startup_banner();

    let p = embassy_rp::init(Default::default());
    let config = SystemConfig::DEFAULT;
    let mut board = Board::new(config, &BOARD_STATE);

    info!("Initializing FIT...");

    let button_devices = [
        (Button::Add, config.add_button),
        (Button::Remove, config.remove_button),
        (Button::Cancel, config.cancel_button),
    ];
    for (id, device) in button_devices {
        if let Err(e) = BUTTONS.register_device(&mut board, id, &device) {
            error!("Button setup failed: {}", e);
            halt();
        }
    }

    let scanner: &'static BoardScanner =
        match BarcodeScanner::create(&mut board, &config.barcode_scanner) {
            Ok(scanner) => SCANNER.init(scanner),
            Err(e) => {
                error!("Barcode scanner setup failed: {}", e);
                halt();
            }
        };

    let microphone: &'static BoardMicrophone = match Microphone::<AdcAudio, GpioLine>::create(
        &mut board,
        &config.audio_core,
        &config.push_to_talk,
        RECORDING.take(),
    ) {
        Ok(microphone) => MICROPHONE.init(microphone),
        Err(e) => {
            error!("Microphone setup failed: {}", e);
            halt();
        }
    };

    let desk: &'static Desk = DESK.init(ConfirmationDesk::new(
        &BUTTONS,
        LogDisplay,
        LogInventory,
        HttpTranslator::new(Offline),
    ));

    let drivers = Drivers {
        buttons: &BUTTONS,
        scanner,
        microphone,
    };
    unwrap!(board::spawn_peripheral_tasks(&spawner, p, &board, drivers));
    unwrap!(spawner.spawn(barcode_task(scanner, desk)));
    unwrap!(spawner.spawn(microphone_task(microphone, desk, EXPORT.take())));

    info!("FIT initialized successfully");

    let context = AppContext {
        buttons: &BUTTONS,
        scanner,
        microphone,
        desk,
    };
    supervisor.run(|| context.stats()).await;
}
