//! Confirmation button acquisition
//!
//! Each registered button owns an edge-capture line. The interrupt handler
//! posts the button id into one shared queue and clears the line's latch;
//! the confirmation workflow unmasks every line for a single window and
//! waits for the first press.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::channels::EventChannel;
use crate::config::BUTTON_QUEUE_SIZE;
use crate::error::{Error, Result};
use crate::hal::{DeviceConfig, DeviceTable, EdgeLine};
use crate::types::Button;

// ===================================================================
// Button Context
// ===================================================================

/// Interrupt context of one registered button
///
/// The interrupt vector resolves a context through [`Buttons::on_irq`] or
/// [`Buttons::on_interrupt`], so the context needs no pointer back to its
/// owner.
struct ButtonContext<L> {
    id: Button,
    irq: u16,
    line: L,
    enabled: bool,
}

impl<L: EdgeLine> ButtonContext<L> {
    fn set_enabled(&mut self, enabled: bool) {
        self.line.set_interrupt_mask(enabled);
        self.line.clear_edge_capture();
        self.enabled = enabled;
    }
}

// ===================================================================
// Buttons
// ===================================================================

/// Set of confirmation buttons sharing one press queue
pub struct Buttons<L: EdgeLine> {
    contexts: Mutex<CriticalSectionRawMutex, RefCell<[Option<ButtonContext<L>>; Button::COUNT]>>,
    presses: EventChannel<Button, BUTTON_QUEUE_SIZE>,
}

impl<L: EdgeLine> Buttons<L> {
    pub const fn new() -> Self {
        Self {
            contexts: Mutex::new(RefCell::new([None, None, None])),
            presses: EventChannel::new(),
        }
    }

    /// Attach `line` to `id`, replacing (and masking) any previous line
    ///
    /// The button starts disabled.
    pub fn register(&self, id: Button, line: L, irq: u16) {
        let previous = self.contexts.lock(|contexts| {
            let mut contexts = contexts.borrow_mut();
            let slot = &mut contexts[id.index()];
            let mut previous = slot.take();
            if let Some(old) = previous.as_mut() {
                old.set_enabled(false);
            }
            let mut context = ButtonContext {
                id,
                irq,
                line,
                enabled: false,
            };
            context.set_enabled(false);
            *slot = Some(context);
            previous
        });
        if previous.is_some() {
            debug!("Buttons: {} re-registered", id);
        }
        debug!("Buttons: {} registered on irq {}", id, irq);
    }

    /// Open the line named by `device` and register it as `id`
    pub fn register_device<T>(&self, table: &mut T, id: Button, device: &DeviceConfig) -> Result<()>
    where
        T: DeviceTable<Line = L>,
    {
        let Some(line) = table.open_line(device) else {
            error!("Buttons: device {} not found", device.name);
            return Err(Error::DeviceNotFound(device.name));
        };
        self.register(id, line, device.irq);
        Ok(())
    }

    /// Unmask one button and clear its stale edge
    ///
    /// Does nothing once the buttons have been closed.
    pub fn enable(&self, id: Button) {
        self.with_context(id, |context| {
            if !self.presses.is_closed() {
                context.set_enabled(true);
            }
        });
    }

    /// Mask one button and clear its stale edge
    pub fn disable(&self, id: Button) {
        self.with_context(id, |context| context.set_enabled(false));
    }

    pub fn enable_all(&self) {
        for id in Button::ALL {
            self.enable(id);
        }
    }

    pub fn disable_all(&self) {
        for id in Button::ALL {
            self.disable(id);
        }
    }

    pub fn is_enabled(&self, id: Button) -> bool {
        self.with_context(id, |context| context.enabled).unwrap_or(false)
    }

    pub fn is_registered(&self, id: Button) -> bool {
        self.with_context(id, |_| ()).is_some()
    }

    /// Wait for the next button press
    ///
    /// Returns `None` once the buttons have been closed.
    pub async fn wait_for_press(&self) -> Option<Button> {
        let pressed = self.presses.recv().await;
        if let Some(id) = pressed {
            debug!("Buttons: {} pressed", id);
        }
        pressed
    }

    /// Drop presses queued outside a confirmation window
    pub fn flush(&self) {
        self.presses.clear();
    }

    /// Interrupt entry point for the line registered as `id`
    pub fn on_interrupt(&self, id: Button) {
        self.with_context(id, |context| self.handle_edge(context));
    }

    /// Interrupt entry point by interrupt line number
    pub fn on_irq(&self, irq: u16) {
        self.contexts.lock(|contexts| {
            let mut contexts = contexts.borrow_mut();
            if let Some(context) = contexts
                .iter_mut()
                .flatten()
                .find(|context| context.irq == irq)
            {
                self.handle_edge(context);
            }
        });
    }

    fn handle_edge(&self, context: &mut ButtonContext<L>) {
        if context.enabled {
            self.presses.post(context.id);
        }
        context.line.clear_edge_capture();
        // Reading the latch back delays the return from the handler and
        // filters spurious re-triggers.
        let _ = context.line.edge_capture();
    }

    /// Release a task blocked in [`wait_for_press`](Self::wait_for_press)
    ///
    /// Closing is permanent: later `enable` calls leave every line masked.
    pub fn close(&self) {
        self.presses.close();
        self.disable_all();
    }

    /// Presses dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.presses.dropped()
    }

    fn with_context<R>(&self, id: Button, f: impl FnOnce(&mut ButtonContext<L>) -> R) -> Option<R> {
        self.contexts.lock(|contexts| {
            let mut contexts = contexts.borrow_mut();
            contexts[id.index()].as_mut().map(f)
        })
    }
}

impl<L: EdgeLine> Default for Buttons<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: EdgeLine> Drop for Buttons<L> {
    fn drop(&mut self) {
        for context in self.contexts.get_mut().get_mut().iter_mut().flatten() {
            context.set_enabled(false);
        }
    }
}
