//! Mock peripherals shared by the driver tests
//!
//! Each mock is a cheap handle onto shared state, so a test keeps a clone
//! to inspect what the driver did with the handle it was given.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use fit_acquisition::hal::{AudioCore, DeviceConfig, DeviceTable, EdgeLine, Ps2Port};

/// Resolve `future` if it completes without outside help, `None` if it would block
pub async fn ready_now<F: core::future::Future>(future: F) -> Option<F::Output> {
    match select(future, yield_now()).await {
        Either::First(output) => Some(output),
        Either::Second(()) => None,
    }
}

// ===================================================================
// Edge Line
// ===================================================================

#[derive(Debug, Default)]
pub struct LineState {
    pub unmasked: bool,
    pub capture: u32,
    pub clears: u32,
}

#[derive(Clone, Default)]
pub struct MockLine(Rc<RefCell<LineState>>);

impl MockLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch an edge; returns whether the interrupt would fire
    pub fn edge(&self) -> bool {
        let mut state = self.0.borrow_mut();
        state.capture = 1;
        state.unmasked
    }

    pub fn unmasked(&self) -> bool {
        self.0.borrow().unmasked
    }

    pub fn capture(&self) -> u32 {
        self.0.borrow().capture
    }

    pub fn clears(&self) -> u32 {
        self.0.borrow().clears
    }
}

impl EdgeLine for MockLine {
    fn set_interrupt_mask(&mut self, enabled: bool) {
        self.0.borrow_mut().unmasked = enabled;
    }

    fn clear_edge_capture(&mut self) {
        let mut state = self.0.borrow_mut();
        state.capture = 0;
        state.clears += 1;
    }

    fn edge_capture(&mut self) -> u32 {
        self.0.borrow().capture
    }
}

// ===================================================================
// PS/2 Port
// ===================================================================

#[derive(Debug, Default)]
pub struct Ps2State {
    pub bytes: VecDeque<u8>,
    pub read_interrupt: bool,
}

#[derive(Clone, Default)]
pub struct MockPs2(Rc<RefCell<Ps2State>>);

impl MockPs2 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive(&self, bytes: &[u8]) {
        self.0.borrow_mut().bytes.extend(bytes.iter().copied());
    }

    pub fn read_interrupt(&self) -> bool {
        self.0.borrow().read_interrupt
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().bytes.len()
    }
}

impl Ps2Port for MockPs2 {
    fn enable_read_interrupt(&mut self) {
        self.0.borrow_mut().read_interrupt = true;
    }

    fn disable_read_interrupt(&mut self) {
        self.0.borrow_mut().read_interrupt = false;
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.0.borrow_mut().bytes.pop_front()
    }
}

// ===================================================================
// Audio Core
// ===================================================================

#[derive(Debug, Default)]
pub struct AudioState {
    pub read_fifo: VecDeque<u32>,
    pub write_fifo: Vec<u32>,
    pub write_capacity: usize,
    pub read_interrupt: bool,
    pub write_interrupt: bool,
    pub resets: u32,
}

#[derive(Clone, Default)]
pub struct MockAudio(Rc<RefCell<AudioState>>);

impl MockAudio {
    pub fn new(write_capacity: usize) -> Self {
        let audio = Self::default();
        audio.0.borrow_mut().write_capacity = write_capacity;
        audio
    }

    /// Samples arriving from the ADC
    pub fn capture(&self, samples: impl IntoIterator<Item = u32>) {
        self.0.borrow_mut().read_fifo.extend(samples);
    }

    /// Samples the DAC has consumed since the last call
    pub fn drain_played(&self) -> Vec<u32> {
        core::mem::take(&mut self.0.borrow_mut().write_fifo)
    }

    pub fn read_interrupt(&self) -> bool {
        self.0.borrow().read_interrupt
    }

    pub fn write_interrupt(&self) -> bool {
        self.0.borrow().write_interrupt
    }

    pub fn unread(&self) -> usize {
        self.0.borrow().read_fifo.len()
    }

    pub fn resets(&self) -> u32 {
        self.0.borrow().resets
    }
}

impl AudioCore for MockAudio {
    fn reset(&mut self) {
        let mut state = self.0.borrow_mut();
        state.read_fifo.clear();
        state.write_fifo.clear();
        state.resets += 1;
    }

    fn enable_read_interrupt(&mut self) {
        self.0.borrow_mut().read_interrupt = true;
    }

    fn disable_read_interrupt(&mut self) {
        self.0.borrow_mut().read_interrupt = false;
    }

    fn enable_write_interrupt(&mut self) {
        self.0.borrow_mut().write_interrupt = true;
    }

    fn disable_write_interrupt(&mut self) {
        self.0.borrow_mut().write_interrupt = false;
    }

    fn read_interrupt_pending(&self) -> bool {
        let state = self.0.borrow();
        state.read_interrupt && !state.read_fifo.is_empty()
    }

    fn write_interrupt_pending(&self) -> bool {
        self.write_interrupt() && self.write_space() > 0
    }

    fn read_available(&self) -> usize {
        self.0.borrow().read_fifo.len()
    }

    fn read_fifo(&mut self, buf: &mut [u32]) -> usize {
        let mut state = self.0.borrow_mut();
        let count = buf.len().min(state.read_fifo.len());
        for slot in buf.iter_mut().take(count) {
            *slot = state.read_fifo.pop_front().unwrap_or_default();
        }
        count
    }

    fn write_space(&self) -> usize {
        let state = self.0.borrow();
        state.write_capacity - state.write_fifo.len()
    }

    fn write_fifo(&mut self, buf: &[u32]) -> usize {
        let count = buf.len().min(self.write_space());
        self.0.borrow_mut().write_fifo.extend_from_slice(&buf[..count]);
        count
    }
}

// ===================================================================
// Device Table
// ===================================================================

#[derive(Default)]
pub struct MockTable {
    pub lines: Vec<(&'static str, MockLine)>,
    pub ps2: Option<(&'static str, MockPs2)>,
    pub audio: Option<(&'static str, MockAudio)>,
}

impl MockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, device: &DeviceConfig, line: &MockLine) -> Self {
        self.lines.push((device.name, line.clone()));
        self
    }

    pub fn with_ps2(mut self, device: &DeviceConfig, port: &MockPs2) -> Self {
        self.ps2 = Some((device.name, port.clone()));
        self
    }

    pub fn with_audio(mut self, device: &DeviceConfig, audio: &MockAudio) -> Self {
        self.audio = Some((device.name, audio.clone()));
        self
    }
}

impl DeviceTable for MockTable {
    type Line = MockLine;
    type Ps2 = MockPs2;
    type Audio = MockAudio;

    fn open_line(&mut self, device: &DeviceConfig) -> Option<MockLine> {
        self.lines
            .iter()
            .find(|(name, _)| *name == device.name)
            .map(|(_, line)| line.clone())
    }

    fn open_ps2(&mut self, device: &DeviceConfig) -> Option<MockPs2> {
        match &self.ps2 {
            Some((name, port)) if *name == device.name => Some(port.clone()),
            _ => None,
        }
    }

    fn open_audio(&mut self, device: &DeviceConfig) -> Option<MockAudio> {
        match &self.audio {
            Some((name, audio)) if *name == device.name => Some(audio.clone()),
            _ => None,
        }
    }
}
