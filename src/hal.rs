//! Hardware capability interfaces
//!
//! Drivers never touch registers themselves. Each peripheral family is
//! implemented once behind one of these traits and injected into the driver,
//! which keeps every decode automaton testable without real silicon.

/// Configuration triple identifying one peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Device name used to look the peripheral up
    pub name: &'static str,
    /// Base address (or pin / channel number on boards without memory-mapped I/O)
    pub base: usize,
    /// Interrupt line the peripheral reports on
    pub irq: u16,
}

impl DeviceConfig {
    pub const fn new(name: &'static str, base: usize, irq: u16) -> Self {
        Self { name, base, irq }
    }
}

/// Edge-capturing input line (push button or switch)
pub trait EdgeLine {
    /// Unmask (`true`) or mask (`false`) the line's interrupt
    fn set_interrupt_mask(&mut self, enabled: bool);

    /// Clear the edge-capture latch
    fn clear_edge_capture(&mut self);

    /// Read back the edge-capture latch
    fn edge_capture(&mut self) -> u32;
}

/// PS/2 host port delivering raw scan-code bytes
pub trait Ps2Port {
    fn enable_read_interrupt(&mut self);
    fn disable_read_interrupt(&mut self);

    /// Next received byte, if any
    fn read_byte(&mut self) -> Option<u8>;
}

/// Audio core with a sample read FIFO (capture) and write FIFO (playback)
pub trait AudioCore {
    /// Reset the core and flush both FIFOs
    fn reset(&mut self);

    fn enable_read_interrupt(&mut self);
    fn disable_read_interrupt(&mut self);
    fn enable_write_interrupt(&mut self);
    fn disable_write_interrupt(&mut self);

    fn read_interrupt_pending(&self) -> bool;
    fn write_interrupt_pending(&self) -> bool;

    /// Samples waiting in the read FIFO
    fn read_available(&self) -> usize;

    /// Move up to `buf.len()` samples out of the read FIFO, returns the count moved
    fn read_fifo(&mut self, buf: &mut [u32]) -> usize;

    /// Free slots in the write FIFO
    fn write_space(&self) -> usize;

    /// Move up to `buf.len()` samples into the write FIFO, returns the count moved
    fn write_fifo(&mut self, buf: &[u32]) -> usize;
}

/// Resolves device triples into peripheral handles
pub trait DeviceTable {
    type Line: EdgeLine;
    type Ps2: Ps2Port;
    type Audio: AudioCore;

    fn open_line(&mut self, device: &DeviceConfig) -> Option<Self::Line>;
    fn open_ps2(&mut self, device: &DeviceConfig) -> Option<Self::Ps2>;
    fn open_audio(&mut self, device: &DeviceConfig) -> Option<Self::Audio>;
}
