//! Raspberry Pi Pico board support
//!
//! The RP2040 has no edge-capture PIO cores, PS/2 controller or audio codec,
//! so each capability is emulated by a small Embassy task that plays the role
//! of the peripheral and then calls the driver's interrupt entry point:
//!
//! - buttons / push-to-talk: GPIO edge task + [`LineLatch`]
//! - barcode scanner: bit-banged PS/2 receiver feeding a byte FIFO
//! - microphone: ADC sampled by a ticker into a sample FIFO (no line-out)

use embassy_executor::{SpawnError, Spawner};
use embassy_rp::adc::{self, Adc, Async};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::{bind_interrupts, Peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Ticker, Timer};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::buttons::Buttons;
use crate::client::{Connection, Connector, NetError};
use crate::config::{
    SystemConfig, AUDIO_FIFO_SIZE, AUDIO_SAMPLE_RATE_HZ, BUTTON_DEBOUNCE_MS, PS2_FIFO_SIZE,
};
use crate::hal::{AudioCore, DeviceConfig, DeviceTable, EdgeLine, Ps2Port};
use crate::microphone::Microphone;
use crate::ps2::Ps2BitReader;
use crate::scanner::BarcodeScanner;
use crate::types::Button;
use crate::workflow::{Inventory, StatusDisplay};

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

/// PS/2 clock gap that aborts a partial frame
const PS2_FRAME_TIMEOUT: Duration = Duration::from_millis(2);

pub type BoardMicrophone = Microphone<'static, AdcAudio, GpioLine>;
pub type BoardScanner = BarcodeScanner<Ps2Receiver>;

// ===================================================================
// Edge Lines
// ===================================================================

/// Emulated edge-capture register of one GPIO line
pub struct LineLatch {
    enabled: AtomicBool,
    capture: AtomicU32,
}

impl LineLatch {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            capture: AtomicU32::new(0),
        }
    }

    /// Latch an edge; returns `false` while the line is masked
    fn capture(&self) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        self.capture.fetch_or(1, Ordering::AcqRel);
        true
    }
}

impl Default for LineLatch {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GpioLine {
    latch: &'static LineLatch,
}

impl EdgeLine for GpioLine {
    fn set_interrupt_mask(&mut self, enabled: bool) {
        self.latch.enabled.store(enabled, Ordering::Release);
    }

    fn clear_edge_capture(&mut self) {
        self.latch.capture.store(0, Ordering::Release);
    }

    fn edge_capture(&mut self) -> u32 {
        self.latch.capture.load(Ordering::Acquire)
    }
}

/// Debounced falling edge; `false` if the level bounced back
async fn debounced_press(input: &mut Input<'static>) -> bool {
    input.wait_for_falling_edge().await;
    Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
    input.is_low()
}

#[embassy_executor::task(pool_size = 3)]
pub async fn button_edge_task(
    mut input: Input<'static>,
    latch: &'static LineLatch,
    buttons: &'static Buttons<GpioLine>,
    id: Button,
) {
    info!("Button edge task started: {}", id);
    loop {
        if debounced_press(&mut input).await && latch.capture() {
            buttons.on_interrupt(id);
        }
        input.wait_for_high().await;
    }
}

/// Push-to-talk reports both edges: press starts, release ends a session
#[embassy_executor::task]
pub async fn push_to_talk_task(
    mut input: Input<'static>,
    latch: &'static LineLatch,
    microphone: &'static BoardMicrophone,
) {
    info!("Push-to-talk task started");
    loop {
        let was_low = input.is_low();
        input.wait_for_any_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        if input.is_low() != was_low && latch.capture() {
            microphone.on_switch_interrupt();
        }
    }
}

// ===================================================================
// PS/2 Receiver
// ===================================================================

/// Bytes received from the scanner, waiting for the driver's handler
pub struct Ps2Fifo {
    bytes: Channel<CriticalSectionRawMutex, u8, PS2_FIFO_SIZE>,
    enabled: AtomicBool,
}

impl Ps2Fifo {
    pub const fn new() -> Self {
        Self {
            bytes: Channel::new(),
            enabled: AtomicBool::new(false),
        }
    }
}

impl Default for Ps2Fifo {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ps2Receiver {
    fifo: &'static Ps2Fifo,
}

impl Ps2Port for Ps2Receiver {
    fn enable_read_interrupt(&mut self) {
        self.fifo.enabled.store(true, Ordering::Release);
    }

    fn disable_read_interrupt(&mut self) {
        self.fifo.enabled.store(false, Ordering::Release);
        self.fifo.bytes.clear();
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.fifo.bytes.try_receive().ok()
    }
}

#[embassy_executor::task]
pub async fn ps2_receiver_task(
    mut clock: Input<'static>,
    data: Input<'static>,
    fifo: &'static Ps2Fifo,
    scanner: &'static BoardScanner,
) {
    info!("PS/2 receiver task started");
    let mut reader = Ps2BitReader::new();
    let mut last_edge = Instant::now();

    loop {
        clock.wait_for_falling_edge().await;
        let now = Instant::now();
        if reader.in_frame() && now.duration_since(last_edge) > PS2_FRAME_TIMEOUT {
            reader.reset();
        }
        last_edge = now;

        match reader.push_bit(data.is_high()) {
            Some(Ok(byte)) => {
                if fifo.enabled.load(Ordering::Acquire) {
                    if fifo.bytes.try_send(byte).is_err() {
                        warn!("PS/2: FIFO full, byte 0x{:02X} lost", byte);
                    }
                    scanner.on_interrupt();
                }
            }
            Some(Err(e)) => warn!("PS/2: frame error {}", e),
            None => {}
        }
    }
}

// ===================================================================
// ADC Audio Core
// ===================================================================

/// Samples captured by the ADC ticker
pub struct AudioFifo {
    samples: Channel<CriticalSectionRawMutex, u32, AUDIO_FIFO_SIZE>,
    read_enabled: AtomicBool,
}

impl AudioFifo {
    pub const fn new() -> Self {
        Self {
            samples: Channel::new(),
            read_enabled: AtomicBool::new(false),
        }
    }
}

impl Default for AudioFifo {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AdcAudio {
    fifo: &'static AudioFifo,
}

impl AudioCore for AdcAudio {
    fn reset(&mut self) {
        self.fifo.samples.clear();
    }

    fn enable_read_interrupt(&mut self) {
        self.fifo.read_enabled.store(true, Ordering::Release);
    }

    fn disable_read_interrupt(&mut self) {
        self.fifo.read_enabled.store(false, Ordering::Release);
    }

    // No line-out on this board
    fn enable_write_interrupt(&mut self) {}
    fn disable_write_interrupt(&mut self) {}

    fn read_interrupt_pending(&self) -> bool {
        self.fifo.read_enabled.load(Ordering::Acquire) && !self.fifo.samples.is_empty()
    }

    fn write_interrupt_pending(&self) -> bool {
        false
    }

    fn read_available(&self) -> usize {
        self.fifo.samples.len()
    }

    fn read_fifo(&mut self, buf: &mut [u32]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.fifo.samples.try_receive() {
                Ok(sample) => {
                    *slot = sample;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        count
    }

    fn write_space(&self) -> usize {
        0
    }

    fn write_fifo(&mut self, _buf: &[u32]) -> usize {
        0
    }
}

/// Sample the microphone at the recording rate while capture is enabled
#[embassy_executor::task]
pub async fn audio_sampler_task(
    mut adc: Adc<'static, Async>,
    mut channel: adc::Channel<'static>,
    fifo: &'static AudioFifo,
    microphone: &'static BoardMicrophone,
) {
    info!("Audio sampler task started");
    let mut ticker = Ticker::every(Duration::from_hz(AUDIO_SAMPLE_RATE_HZ as u64));

    loop {
        ticker.next().await;
        if !fifo.read_enabled.load(Ordering::Acquire) {
            continue;
        }
        match adc.read(&mut channel).await {
            // 12-bit reading, left-aligned into the 32-bit sample word
            Ok(level) => {
                let _ = fifo.samples.try_send(u32::from(level) << 20);
            }
            Err(e) => warn!("Audio: ADC error {}", e),
        }
        // The push-to-talk release drains whatever is left below the threshold
        if fifo.samples.len() >= AUDIO_FIFO_SIZE / 2 {
            microphone.on_codec_interrupt();
        }
    }
}

// ===================================================================
// Device Table
// ===================================================================

/// Latches and FIFOs backing the emulated peripherals
pub struct BoardState {
    pub lines: [LineLatch; 4],
    pub ps2: Ps2Fifo,
    pub audio: AudioFifo,
}

impl BoardState {
    pub const fn new() -> Self {
        Self {
            lines: [
                LineLatch::new(),
                LineLatch::new(),
                LineLatch::new(),
                LineLatch::new(),
            ],
            ps2: Ps2Fifo::new(),
            audio: AudioFifo::new(),
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the configured device names to the board's peripherals
pub struct Board {
    config: SystemConfig,
    state: &'static BoardState,
}

impl Board {
    pub fn new(config: SystemConfig, state: &'static BoardState) -> Self {
        Self { config, state }
    }

    fn line_index(&self, device: &DeviceConfig) -> Option<usize> {
        let lines = [
            self.config.add_button,
            self.config.remove_button,
            self.config.cancel_button,
            self.config.push_to_talk,
        ];
        lines.iter().position(|line| line.name == device.name)
    }

    pub fn latch(&self, device: &DeviceConfig) -> Option<&'static LineLatch> {
        let state = self.state;
        self.line_index(device).map(|index| &state.lines[index])
    }
}

impl DeviceTable for Board {
    type Line = GpioLine;
    type Ps2 = Ps2Receiver;
    type Audio = AdcAudio;

    fn open_line(&mut self, device: &DeviceConfig) -> Option<GpioLine> {
        self.latch(device).map(|latch| GpioLine { latch })
    }

    fn open_ps2(&mut self, device: &DeviceConfig) -> Option<Ps2Receiver> {
        (device.name == self.config.barcode_scanner.name).then_some(Ps2Receiver {
            fifo: &self.state.ps2,
        })
    }

    fn open_audio(&mut self, device: &DeviceConfig) -> Option<AdcAudio> {
        (device.name == self.config.audio_core.name).then_some(AdcAudio {
            fifo: &self.state.audio,
        })
    }
}

// ===================================================================
// Collaborators
// ===================================================================

/// Status display on the debug probe
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, text: &str) {
        info!("Display: {}", text);
    }

    fn clear(&mut self) {}
}

/// Inventory backend that only logs the committed change
pub struct LogInventory;

impl Inventory for LogInventory {
    async fn add_item(&mut self, item: &str) -> Result<(), NetError> {
        info!("Inventory: added {}", item);
        Ok(())
    }

    async fn remove_item(&mut self, item: &str) -> Result<(), NetError> {
        info!("Inventory: removed {}", item);
        Ok(())
    }
}

/// The Pico has no network interface: every connection attempt fails
pub struct Offline;

pub enum NoConnection {}

impl Connection for NoConnection {
    async fn write_all(&mut self, _buf: &[u8]) -> Result<(), NetError> {
        match *self {}
    }

    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, NetError> {
        match *self {}
    }
}

impl Connector for Offline {
    type Connection = NoConnection;

    async fn connect(&mut self, _host: &str, _port: u16) -> Result<NoConnection, NetError> {
        Err(NetError::Connect)
    }
}

// ===================================================================
// Task Spawning
// ===================================================================

/// Acquisition drivers the board tasks report to
pub struct Drivers {
    pub buttons: &'static Buttons<GpioLine>,
    pub scanner: &'static BoardScanner,
    pub microphone: &'static BoardMicrophone,
}

/// Spawn the emulated peripheral tasks
pub fn spawn_peripheral_tasks(
    spawner: &Spawner,
    p: Peripherals,
    board: &Board,
    drivers: Drivers,
) -> Result<(), SpawnError> {
    let config = board.config;
    let state = board.state;
    let lines = &state.lines;

    info!("Initializing board peripherals");

    spawner.spawn(button_edge_task(
        Input::new(p.PIN_2, Pull::Up),
        &lines[0],
        drivers.buttons,
        Button::Add,
    ))?;
    spawner.spawn(button_edge_task(
        Input::new(p.PIN_3, Pull::Up),
        &lines[1],
        drivers.buttons,
        Button::Remove,
    ))?;
    spawner.spawn(button_edge_task(
        Input::new(p.PIN_4, Pull::Up),
        &lines[2],
        drivers.buttons,
        Button::Cancel,
    ))?;
    spawner.spawn(push_to_talk_task(
        Input::new(p.PIN_5, Pull::Up),
        &lines[3],
        drivers.microphone,
    ))?;
    debug!(
        "Lines: {} {} {} {}",
        config.add_button.name,
        config.remove_button.name,
        config.cancel_button.name,
        config.push_to_talk.name
    );

    spawner.spawn(ps2_receiver_task(
        Input::new(p.PIN_6, Pull::Up),
        Input::new(p.PIN_7, Pull::Up),
        &state.ps2,
        drivers.scanner,
    ))?;

    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let mic = adc::Channel::new_pin(p.PIN_26, Pull::None);
    spawner.spawn(audio_sampler_task(adc, mic, &state.audio, drivers.microphone))?;

    spawner.spawn(status_task(Output::new(p.PIN_25, Level::Low)))?;

    Ok(())
}

/// Status LED task implementation
#[embassy_executor::task]
pub async fn status_task(mut status_led: Output<'static>) {
    info!("Status LED task started");

    loop {
        // Heartbeat pattern - short blink every second
        status_led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        status_led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
