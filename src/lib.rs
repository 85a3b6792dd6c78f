//! FIT - Food Inventory Tracker acquisition core
//!
//! Interrupt-driven input drivers for a food inventory terminal built on the
//! Embassy synchronisation primitives.
//!
//! ## Drivers
//! - Confirmation buttons (add / remove / cancel)
//! - PS/2 barcode scanner
//! - Push-to-talk microphone
//!
//! ## Architecture
//! - **Interrupt side**: handlers read the hardware, copy a bounded amount of
//!   data, post to a channel and clear the interrupt source
//! - **Task side**: async tasks wait on the channels and run the decoders
//! - **Channels**: fixed-capacity, drop-newest, explicitly closable
//! - **Hardware**: reached only through the capability traits in [`hal`]

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod buttons;
pub mod channels;
pub mod client;
pub mod config;
pub mod error;
pub mod hal;
pub mod keymap;
pub mod microphone;
pub mod ps2;
pub mod scanner;
pub mod supervisor;
pub mod types;
pub mod workflow;

#[cfg(feature = "rp2040")]
pub mod board;

pub use buttons::Buttons;
pub use channels::EventChannel;
pub use error::{Error, Result};
pub use microphone::{Microphone, SessionState};
pub use scanner::{BarcodeAssembler, BarcodeScanner, ScanCodeDecoder};
pub use types::{Barcode, Button, RawKeyEvent};
