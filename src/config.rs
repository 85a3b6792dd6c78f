//! Hardware and application configuration for the FIT terminal

use crate::hal::DeviceConfig;

// ===================================================================
// Acquisition Queues
// ===================================================================

pub const BUTTON_QUEUE_SIZE: usize = 64; // Button id queue (ISR -> confirmation window)
pub const BARCODE_QUEUE_SIZE: usize = 64; // Raw key events (ISR -> barcode task)
pub const PUSH_TO_TALK_QUEUE_SIZE: usize = 4; // Pending push-to-talk edges

// ===================================================================
// Barcode Scanner
// ===================================================================

pub const MAX_BARCODE_LENGTH: usize = 48; // Characters kept per barcode
pub const MAX_KEY_NAME_LENGTH: usize = 16; // Longest canonical key name

// ===================================================================
// Microphone
// ===================================================================

pub const MAX_RECORD_TIME_SECONDS: usize = 4;
pub const AUDIO_SAMPLE_RATE_HZ: usize = 8_000;
pub const RECORDING_CAPACITY: usize =
    recording_capacity(MAX_RECORD_TIME_SECONDS, AUDIO_SAMPLE_RATE_HZ);

/// Number of samples needed to hold `seconds` of audio at `rate_hz`
pub const fn recording_capacity(seconds: usize, rate_hz: usize) -> usize {
    seconds * rate_hz
}

// ===================================================================
// Confirmation Workflow / Translation Server
// ===================================================================

pub const ITEM_SIZE: usize = 64; // Translated item text shown to the user
pub const SERVER_HOST: &str = "13.56.5.40";
pub const SERVER_PORT: u16 = 80;
pub const HTTP_REQUEST_SIZE: usize = 256; // Request line + headers
pub const HTTP_RESPONSE_SIZE: usize = 1024; // Whole response incl. headers
pub const HTTP_CHUNK_SIZE: usize = 128; // Samples per audio body write
pub const CONNECT_FAILURE_TEXT: &str = "Could not connect to internet.";

// ===================================================================
// GPIO Pin Assignments - Raspberry Pi Pico
// ===================================================================

pub const BTN_ADD_PIN: u8 = 2;
pub const BTN_REMOVE_PIN: u8 = 3;
pub const BTN_CANCEL_PIN: u8 = 4;
pub const PTT_SWITCH_PIN: u8 = 5;
pub const PS2_CLOCK_PIN: u8 = 6; // Barcode scanner PS/2 clock (open drain)
pub const PS2_DATA_PIN: u8 = 7; // Barcode scanner PS/2 data
pub const MIC_ADC_PIN: u8 = 26; // ADC0, electret pre-amp output
pub const LED_STATUS_PIN: u8 = 25; // Built-in LED on Pico

pub const BUTTON_DEBOUNCE_MS: u64 = 20; // Button / switch debounce time
pub const PS2_FIFO_SIZE: usize = 16; // Bytes buffered between PS/2 receiver and ISR entry
pub const AUDIO_FIFO_SIZE: usize = 128; // Samples buffered by the ADC sampler

// ===================================================================
// Device Table
// ===================================================================

/// Device triples for every acquisition peripheral
#[derive(Debug, Clone, Copy)]
pub struct SystemConfig {
    pub add_button: DeviceConfig,
    pub remove_button: DeviceConfig,
    pub cancel_button: DeviceConfig,
    pub push_to_talk: DeviceConfig,
    pub barcode_scanner: DeviceConfig,
    pub audio_core: DeviceConfig,
}

impl SystemConfig {
    /// Board layout; `base` is the GPIO / ADC channel, `irq` the line the
    /// edge task reports on
    pub const DEFAULT: Self = Self {
        add_button: DeviceConfig::new("add_button", BTN_ADD_PIN as usize, 0),
        remove_button: DeviceConfig::new("remove_button", BTN_REMOVE_PIN as usize, 1),
        cancel_button: DeviceConfig::new("cancel_button", BTN_CANCEL_PIN as usize, 2),
        push_to_talk: DeviceConfig::new("push_to_talk", PTT_SWITCH_PIN as usize, 3),
        barcode_scanner: DeviceConfig::new("barcode_scanner_ps2", PS2_CLOCK_PIN as usize, 4),
        audio_core: DeviceConfig::new("audio", MIC_ADC_PIN as usize, 5),
    };
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
