//! Barcode scanner driver
//!
//! The scanner is a PS/2 keyboard device. Its interrupt handler frames the
//! raw bytes into [`RawKeyEvent`]s and posts them; the barcode task decodes
//! them into key presses and assembles a [`Barcode`] until `ENTER`.
//!
//! ## Decode rules
//! - `L CTRL` toggles assembly once per keystroke: the press half flips it,
//!   the release half is swallowed. One control keystroke pauses capture and
//!   the next resumes it.
//! - `L SHFT` is ignored.
//! - Every other known key toggles the [`KeyPosition`]; only the transition
//!   into `Down` counts as a key press.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::channels::EventChannel;
use crate::config::BARCODE_QUEUE_SIZE;
use crate::error::{Error, Result};
use crate::hal::{DeviceConfig, DeviceTable, Ps2Port};
use crate::keymap::{self, ENTER, LEFT_CTRL, LEFT_SHIFT};
use crate::ps2::ScanCodeFramer;
use crate::types::{Barcode, KeyPosition, RawKeyEvent};

pub type KeyEventChannel = EventChannel<RawKeyEvent, BARCODE_QUEUE_SIZE>;

// ===================================================================
// Scan Code Decoder
// ===================================================================

/// Turns raw key events into key presses
#[derive(Debug, Clone)]
pub struct ScanCodeDecoder {
    position: KeyPosition,
    assembly_enabled: bool,
}

impl ScanCodeDecoder {
    pub const fn new() -> Self {
        Self {
            position: KeyPosition::Up,
            assembly_enabled: true,
        }
    }

    /// Process one event, returns the key name if it completes a key press
    pub fn process(&mut self, event: RawKeyEvent) -> Option<&'static str> {
        let Some(name) = keymap::key_name(event) else {
            debug!("Scanner: unknown scan code 0x{:02X}", event.code);
            return None;
        };

        if name == LEFT_CTRL {
            if !event.mode.is_break() {
                self.assembly_enabled = !self.assembly_enabled;
                debug!("Scanner: assembly {}", if self.assembly_enabled { "resumed" } else { "paused" });
            }
            return None;
        }

        if !self.assembly_enabled || name == LEFT_SHIFT {
            return None;
        }

        self.position = self.position.toggled();
        match self.position {
            KeyPosition::Down => Some(name),
            KeyPosition::Up => None,
        }
    }

    pub fn assembly_enabled(&self) -> bool {
        self.assembly_enabled
    }

    pub fn position(&self) -> KeyPosition {
        self.position
    }
}

impl Default for ScanCodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ===================================================================
// Barcode Assembler
// ===================================================================

/// Task-side half of the scanner: decodes events into barcodes
pub struct BarcodeAssembler<'a, const N: usize> {
    events: &'a EventChannel<RawKeyEvent, N>,
    decoder: ScanCodeDecoder,
    barcode: Barcode,
}

impl<'a, const N: usize> BarcodeAssembler<'a, N> {
    pub fn new(events: &'a EventChannel<RawKeyEvent, N>) -> Self {
        Self {
            events,
            decoder: ScanCodeDecoder::new(),
            barcode: Barcode::new(),
        }
    }

    /// Feed one event, returns the barcode when `ENTER` is pressed
    pub fn feed(&mut self, event: RawKeyEvent) -> Option<Barcode> {
        let key = self.decoder.process(event)?;
        if key == ENTER {
            let barcode = core::mem::take(&mut self.barcode);
            if barcode.is_truncated() {
                warn!("Scanner: barcode truncated to {} characters", barcode.len());
            }
            return Some(barcode);
        }
        self.barcode.push_key(key);
        None
    }

    /// Wait until a whole barcode has been scanned
    pub async fn decode(&mut self) -> Barcode {
        self.barcode.clear();
        loop {
            let event = self.events.receive().await;
            if let Some(barcode) = self.feed(event) {
                return barcode;
            }
        }
    }

    /// Like [`decode`](Self::decode), but returns `None` once the scanner is closed
    pub async fn decode_or_closed(&mut self) -> Option<Barcode> {
        self.barcode.clear();
        loop {
            let event = self.events.recv().await?;
            if let Some(barcode) = self.feed(event) {
                return Some(barcode);
            }
        }
    }

    pub fn decoder(&self) -> &ScanCodeDecoder {
        &self.decoder
    }
}

// ===================================================================
// Barcode Scanner Driver
// ===================================================================

struct PortState<P> {
    port: P,
    framer: ScanCodeFramer,
}

/// Interrupt-side half of the scanner: owns the PS/2 port and the event channel
pub struct BarcodeScanner<P: Ps2Port> {
    port: Mutex<CriticalSectionRawMutex, RefCell<PortState<P>>>,
    events: KeyEventChannel,
    irq: u16,
}

impl<P: Ps2Port> BarcodeScanner<P> {
    /// Wrap an already opened port and enable its read interrupt
    pub fn new(mut port: P, irq: u16) -> Self {
        port.enable_read_interrupt();
        Self {
            port: Mutex::new(RefCell::new(PortState {
                port,
                framer: ScanCodeFramer::new(),
            })),
            events: EventChannel::new(),
            irq,
        }
    }

    /// Open the PS/2 port named by `device`
    pub fn create<T>(table: &mut T, device: &DeviceConfig) -> Result<Self>
    where
        T: DeviceTable<Ps2 = P>,
    {
        let Some(port) = table.open_ps2(device) else {
            error!("Scanner: device {} not found", device.name);
            return Err(Error::DeviceNotFound(device.name));
        };
        info!("Scanner: opened {} on irq {}", device.name, device.irq);
        Ok(Self::new(port, device.irq))
    }

    /// Interrupt entry point: drain the port and post complete events
    pub fn on_interrupt(&self) {
        self.port.lock(|state| {
            let mut state = state.borrow_mut();
            let PortState { port, framer } = &mut *state;
            while let Some(byte) = port.read_byte() {
                if let Some(event) = framer.push(byte) {
                    self.events.post(event);
                }
            }
        });
    }

    /// Task-side decoder reading from this scanner
    pub fn assembler(&self) -> BarcodeAssembler<'_, BARCODE_QUEUE_SIZE> {
        BarcodeAssembler::new(&self.events)
    }

    pub fn events(&self) -> &KeyEventChannel {
        &self.events
    }

    pub fn irq(&self) -> u16 {
        self.irq
    }

    /// Stop acquisition and release a task blocked in `decode_or_closed`
    pub fn close(&self) {
        self.port.lock(|state| {
            let mut state = state.borrow_mut();
            state.port.disable_read_interrupt();
            state.framer.reset();
        });
        self.events.close();
    }

    /// Key events dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.events.dropped()
    }
}

impl<P: Ps2Port> Drop for BarcodeScanner<P> {
    fn drop(&mut self) {
        self.port.get_mut().get_mut().port.disable_read_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecodeMode;

    fn make(code: u8) -> RawKeyEvent {
        let mode = if keymap::is_printable(code) {
            DecodeMode::AsciiMake
        } else {
            DecodeMode::BinaryMake
        };
        RawKeyEvent::new(mode, code)
    }

    fn brk(code: u8) -> RawKeyEvent {
        RawKeyEvent::new(DecodeMode::Break, code)
    }

    #[test]
    fn only_down_transition_is_a_press() {
        let mut decoder = ScanCodeDecoder::new();
        assert_eq!(decoder.process(make(0x16)), Some("1"));
        assert_eq!(decoder.position(), KeyPosition::Down);
        assert_eq!(decoder.process(brk(0x16)), None);
        assert_eq!(decoder.position(), KeyPosition::Up);
    }

    #[test]
    fn shift_does_not_move_position() {
        let mut decoder = ScanCodeDecoder::new();
        assert_eq!(decoder.process(make(0x12)), None);
        assert_eq!(decoder.process(brk(0x12)), None);
        assert_eq!(decoder.position(), KeyPosition::Up);
    }

    #[test]
    fn control_keystroke_toggles_assembly_once() {
        let mut decoder = ScanCodeDecoder::new();
        decoder.process(make(0x14));
        assert!(!decoder.assembly_enabled());
        decoder.process(brk(0x14));
        assert!(!decoder.assembly_enabled());
        assert_eq!(decoder.process(make(0x16)), None);
        assert_eq!(decoder.process(brk(0x16)), None);
        assert_eq!(decoder.position(), KeyPosition::Up);

        decoder.process(make(0x14));
        decoder.process(brk(0x14));
        assert!(decoder.assembly_enabled());
        assert_eq!(decoder.process(make(0x16)), Some("1"));
    }

    #[test]
    fn unknown_codes_are_skipped() {
        let mut decoder = ScanCodeDecoder::new();
        assert_eq!(decoder.process(make(0x60)), None);
        assert_eq!(decoder.position(), KeyPosition::Up);
    }
}
