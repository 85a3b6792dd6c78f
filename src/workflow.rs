//! Confirmation workflow and acquisition task bodies
//!
//! A finished artifact (barcode or recording) is translated into item text,
//! shown on the status display, and committed once the user presses add or
//! remove. Only one item can be confirmed at a time: the station is taken
//! with `try_lock`, and an artifact arriving while another item waits for its
//! button press is discarded instead of queued.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use crate::buttons::Buttons;
use crate::client::{NetError, Translator};
use crate::error::Error;
use crate::hal::{AudioCore, EdgeLine, Ps2Port};
use crate::microphone::Microphone;
use crate::scanner::BarcodeScanner;
use crate::supervisor::AcquisitionStats;
use crate::types::{Barcode, Button};

// ===================================================================
// Collaborators
// ===================================================================

/// Text display showing the item awaiting confirmation
pub trait StatusDisplay {
    fn show(&mut self, text: &str);
    fn clear(&mut self);
}

/// Inventory backend committing confirmed items
#[allow(async_fn_in_trait)]
pub trait Inventory {
    async fn add_item(&mut self, item: &str) -> Result<(), NetError>;
    async fn remove_item(&mut self, item: &str) -> Result<(), NetError>;
}

/// Outcome of one confirmation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    Added,
    Removed,
    Cancelled,
    /// The buttons were closed while waiting
    Closed,
}

/// Outcome of submitting an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Submission {
    Confirmed(Decision),
    /// Another item was being confirmed
    Discarded,
}

// ===================================================================
// Confirmation Desk
// ===================================================================

/// Display, inventory and translator used by one confirmation at a time
pub struct Station<D, I, T> {
    pub display: D,
    pub inventory: I,
    pub translator: T,
}

pub struct ConfirmationDesk<'a, L: EdgeLine, D, I, T> {
    buttons: &'a Buttons<L>,
    station: Mutex<CriticalSectionRawMutex, Station<D, I, T>>,
}

impl<'a, L, D, I, T> ConfirmationDesk<'a, L, D, I, T>
where
    L: EdgeLine,
    D: StatusDisplay,
    I: Inventory,
    T: Translator,
{
    pub fn new(buttons: &'a Buttons<L>, display: D, inventory: I, translator: T) -> Self {
        Self {
            buttons,
            station: Mutex::new(Station {
                display,
                inventory,
                translator,
            }),
        }
    }

    /// Show `item` and commit it according to the next button press
    ///
    /// Waits for the station if another confirmation is in progress.
    pub async fn confirm(&self, item: &str) -> Decision {
        let mut station = self.station.lock().await;
        self.run_window(&mut station, item).await
    }

    /// Translate and confirm a scanned barcode, unless the desk is busy
    pub async fn submit_barcode(&self, barcode: &Barcode) -> Submission {
        let Ok(mut station) = self.station.try_lock() else {
            warn!("Workflow: desk busy, discarding barcode {}", barcode);
            return Submission::Discarded;
        };
        let item = station.translator.translate_barcode(barcode.as_str()).await;
        Submission::Confirmed(self.run_window(&mut station, &item).await)
    }

    /// Translate and confirm a linear16 recording, unless the desk is busy
    pub async fn submit_recording(&self, samples: &[u16]) -> Submission {
        let Ok(mut station) = self.station.try_lock() else {
            warn!("Workflow: desk busy, discarding {} samples", samples.len());
            return Submission::Discarded;
        };
        let item = station.translator.translate_audio(samples).await;
        Submission::Confirmed(self.run_window(&mut station, &item).await)
    }

    /// Whether a confirmation is in progress
    pub fn is_busy(&self) -> bool {
        self.station.try_lock().is_err()
    }

    pub fn buttons(&self) -> &'a Buttons<L> {
        self.buttons
    }

    /// Take the collaborators back out of the desk
    pub fn into_station(self) -> Station<D, I, T> {
        self.station.into_inner()
    }

    async fn run_window(&self, station: &mut Station<D, I, T>, item: &str) -> Decision {
        station.display.clear();
        station.display.show(item);

        self.buttons.flush();
        self.buttons.enable_all();
        let pressed = self.buttons.wait_for_press().await;
        self.buttons.disable_all();

        station.display.clear();

        let decision = match pressed {
            Some(Button::Add) => {
                if let Err(e) = station.inventory.add_item(item).await {
                    warn!("Workflow: add failed: {}", e);
                }
                Decision::Added
            }
            Some(Button::Remove) => {
                if let Err(e) = station.inventory.remove_item(item).await {
                    warn!("Workflow: remove failed: {}", e);
                }
                Decision::Removed
            }
            Some(Button::Cancel) => Decision::Cancelled,
            None => Decision::Closed,
        };
        info!("Workflow: {} -> {}", item, decision);
        decision
    }
}

// ===================================================================
// Task Bodies
// ===================================================================

/// Decode barcodes and submit them until the scanner is closed
pub async fn barcode_loop<P, L, D, I, T>(
    scanner: &BarcodeScanner<P>,
    desk: &ConfirmationDesk<'_, L, D, I, T>,
) where
    P: Ps2Port,
    L: EdgeLine,
    D: StatusDisplay,
    I: Inventory,
    T: Translator,
{
    info!("Barcode task started");
    let mut assembler = scanner.assembler();
    while let Some(barcode) = assembler.decode_or_closed().await {
        debug!("Workflow: scanned {}", barcode);
        desk.submit_barcode(&barcode).await;
    }
    info!("Barcode task stopped");
}

/// Record push-to-talk sessions and submit them until the microphone is closed
///
/// `export` receives the linear16 samples of each session.
pub async fn microphone_loop<A, L, D, I, T>(
    microphone: &Microphone<'_, A, L>,
    desk: &ConfirmationDesk<'_, L, D, I, T>,
    export: &mut [u16],
) -> Error
where
    A: AudioCore,
    L: EdgeLine,
    D: StatusDisplay,
    I: Inventory,
    T: Translator,
{
    info!("Microphone task started");
    loop {
        microphone.enable_push_to_talk();
        if let Err(e) = microphone.wait_and_begin_recording().await {
            microphone.disable_push_to_talk();
            info!("Microphone task stopped: {}", e);
            return e;
        }
        let finished = microphone.wait_and_finish_recording().await;
        microphone.disable_push_to_talk();
        if let Err(e) = finished {
            info!("Microphone task stopped: {}", e);
            return e;
        }

        let count = microphone.export_linear16(export);
        desk.submit_recording(&export[..count]).await;
    }
}

// ===================================================================
// Application Context
// ===================================================================

/// Drivers and desk shared by the acquisition tasks, built once at startup
pub struct AppContext<'a, 'b, P, A, L, D, I, T>
where
    P: Ps2Port,
    A: AudioCore,
    L: EdgeLine,
{
    pub buttons: &'a Buttons<L>,
    pub scanner: &'a BarcodeScanner<P>,
    pub microphone: &'a Microphone<'b, A, L>,
    pub desk: &'a ConfirmationDesk<'a, L, D, I, T>,
}

impl<'a, 'b, P, A, L, D, I, T> AppContext<'a, 'b, P, A, L, D, I, T>
where
    P: Ps2Port,
    A: AudioCore,
    L: EdgeLine,
    D: StatusDisplay,
    I: Inventory,
    T: Translator,
{
    pub async fn run_barcode(&self) {
        barcode_loop(self.scanner, self.desk).await
    }

    pub async fn run_microphone(&self, export: &mut [u16]) -> Error {
        microphone_loop(self.microphone, self.desk, export).await
    }

    /// Drop counters of every acquisition channel
    pub fn stats(&self) -> AcquisitionStats {
        AcquisitionStats {
            button_presses_dropped: self.buttons.dropped(),
            key_events_dropped: self.scanner.dropped(),
            push_to_talk_dropped: self.microphone.dropped(),
        }
    }

    /// Close every driver, releasing all blocked tasks
    pub fn shutdown(&self) {
        info!("Shutting down acquisition");
        self.scanner.close();
        self.microphone.close();
        self.buttons.close();
    }
}
