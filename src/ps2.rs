//! PS/2 scan-code framing
//!
//! Two layers, both constant time per input:
//! - [`Ps2BitReader`] assembles the 11-bit device-to-host frames clocked in
//!   by the board's receiver into bytes.
//! - [`ScanCodeFramer`] runs inside the barcode scanner's interrupt handler.
//!   Bytes arrive one at a time; prefixes are folded into the framer state
//!   and a [`RawKeyEvent`] is emitted once a code is complete.

use crate::keymap;
use crate::types::{DecodeMode, RawKeyEvent};

const EXTENDED_PREFIX: u8 = 0xE0;
const BREAK_PREFIX: u8 = 0xF0;
const PAUSE_PREFIX: u8 = 0xE1;
const PAUSE_SEQUENCE_LEN: u8 = 7; // bytes after 0xE1

/// Keyboard-to-host protocol bytes that are not scan codes
const RESPONSES: [u8; 6] = [
    0x00, // key detection error
    0xAA, // self-test passed
    0xEE, // echo
    0xFA, // acknowledge
    0xFE, // resend
    0xFF, // key detection error
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Extended,
    Break,
    ExtendedBreak,
    Pause(u8),
}

/// Scan-code set 2 framer
#[derive(Debug, Clone)]
pub struct ScanCodeFramer {
    state: FrameState,
}

impl ScanCodeFramer {
    pub const fn new() -> Self {
        Self {
            state: FrameState::Idle,
        }
    }

    /// Discard any partially received code
    pub fn reset(&mut self) {
        self.state = FrameState::Idle;
    }

    /// Feed one byte, returns an event when a code is complete
    pub fn push(&mut self, byte: u8) -> Option<RawKeyEvent> {
        match self.state {
            FrameState::Pause(remaining) => {
                self.state = if remaining > 1 {
                    FrameState::Pause(remaining - 1)
                } else {
                    FrameState::Idle
                };
                None
            }
            FrameState::Idle => match byte {
                EXTENDED_PREFIX => {
                    self.state = FrameState::Extended;
                    None
                }
                BREAK_PREFIX => {
                    self.state = FrameState::Break;
                    None
                }
                PAUSE_PREFIX => {
                    self.state = FrameState::Pause(PAUSE_SEQUENCE_LEN);
                    None
                }
                b if RESPONSES.contains(&b) => None,
                code => {
                    let mode = if keymap::is_printable(code) {
                        DecodeMode::AsciiMake
                    } else {
                        DecodeMode::BinaryMake
                    };
                    Some(RawKeyEvent::new(mode, code))
                }
            },
            FrameState::Extended => match byte {
                BREAK_PREFIX => {
                    self.state = FrameState::ExtendedBreak;
                    None
                }
                // Fake shifts around print screen / numpad keys
                0x12 | 0x59 => {
                    self.state = FrameState::Idle;
                    None
                }
                code => {
                    self.state = FrameState::Idle;
                    Some(RawKeyEvent::new(DecodeMode::LongBinaryMake, code))
                }
            },
            FrameState::Break => {
                self.state = FrameState::Idle;
                Some(RawKeyEvent::new(DecodeMode::Break, byte))
            }
            FrameState::ExtendedBreak => {
                self.state = FrameState::Idle;
                match byte {
                    0x12 | 0x59 => None,
                    code => Some(RawKeyEvent::new(DecodeMode::LongBreak, code)),
                }
            }
        }
    }
}

impl Default for ScanCodeFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame error reported by [`Ps2BitReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    Parity,
    StopBit,
}

/// Device-to-host frame reader: start bit, 8 data bits LSB first, odd parity, stop bit
#[derive(Debug, Clone, Default)]
pub struct Ps2BitReader {
    bit: u8,
    data: u8,
    ones: u8,
}

impl Ps2BitReader {
    pub const fn new() -> Self {
        Self {
            bit: 0,
            data: 0,
            ones: 0,
        }
    }

    /// Drop a partial frame, e.g. after a clock timeout
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.bit != 0
    }

    /// Feed the data line level sampled on a falling clock edge
    pub fn push_bit(&mut self, high: bool) -> Option<Result<u8, FrameError>> {
        match self.bit {
            // A high start bit is line noise, keep waiting for a real one
            0 if high => None,
            0 => {
                self.bit = 1;
                None
            }
            1..=8 => {
                if high {
                    self.data |= 1 << (self.bit - 1);
                    self.ones += 1;
                }
                self.bit += 1;
                None
            }
            9 => {
                if high {
                    self.ones += 1;
                }
                self.bit = 10;
                None
            }
            _ => {
                let result = if !high {
                    Err(FrameError::StopBit)
                } else if self.ones % 2 == 0 {
                    Err(FrameError::Parity)
                } else {
                    Ok(self.data)
                };
                self.reset();
                Some(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &[u8]) -> std::vec::Vec<RawKeyEvent> {
        let mut framer = ScanCodeFramer::new();
        bytes.iter().filter_map(|&b| framer.push(b)).collect()
    }

    #[test]
    fn make_and_break() {
        // "1" pressed and released
        assert_eq!(
            frame(&[0x16, 0xF0, 0x16]),
            [
                RawKeyEvent::new(DecodeMode::AsciiMake, 0x16),
                RawKeyEvent::new(DecodeMode::Break, 0x16),
            ]
        );
    }

    #[test]
    fn non_printing_key_is_binary() {
        // Enter, left shift
        assert_eq!(
            frame(&[0x5A, 0x12]),
            [
                RawKeyEvent::new(DecodeMode::BinaryMake, 0x5A),
                RawKeyEvent::new(DecodeMode::BinaryMake, 0x12),
            ]
        );
    }

    #[test]
    fn extended_make_and_break() {
        // Right control
        assert_eq!(
            frame(&[0xE0, 0x14, 0xE0, 0xF0, 0x14]),
            [
                RawKeyEvent::new(DecodeMode::LongBinaryMake, 0x14),
                RawKeyEvent::new(DecodeMode::LongBreak, 0x14),
            ]
        );
    }

    #[test]
    fn protocol_responses_are_ignored() {
        assert!(frame(&[0xAA, 0xFA, 0xFE]).is_empty());
    }

    fn clock_in(reader: &mut Ps2BitReader, frame: [bool; 11]) -> std::vec::Vec<Result<u8, FrameError>> {
        frame.iter().filter_map(|&bit| reader.push_bit(bit)).collect()
    }

    fn frame_bits(byte: u8, parity_ok: bool) -> [bool; 11] {
        let mut bits = [false; 11];
        for i in 0..8 {
            bits[1 + i] = byte & (1 << i) != 0;
        }
        let odd = byte.count_ones() % 2 == 1;
        bits[9] = if parity_ok { !odd } else { odd };
        bits[10] = true;
        bits
    }

    #[test]
    fn bit_reader_assembles_byte() {
        let mut reader = Ps2BitReader::new();
        assert_eq!(clock_in(&mut reader, frame_bits(0x16, true)), [Ok(0x16)]);
        assert_eq!(clock_in(&mut reader, frame_bits(0xF0, true)), [Ok(0xF0)]);
        assert!(!reader.in_frame());
    }

    #[test]
    fn bit_reader_rejects_bad_parity_and_stop() {
        let mut reader = Ps2BitReader::new();
        assert_eq!(clock_in(&mut reader, frame_bits(0x5A, false)), [Err(FrameError::Parity)]);

        let mut bits = frame_bits(0x5A, true);
        bits[10] = false;
        assert_eq!(clock_in(&mut reader, bits), [Err(FrameError::StopBit)]);
    }

    #[test]
    fn bit_reader_skips_high_idle_bits() {
        let mut reader = Ps2BitReader::new();
        assert_eq!(reader.push_bit(true), None);
        assert!(!reader.in_frame());
        assert_eq!(clock_in(&mut reader, frame_bits(0x1C, true)), [Ok(0x1C)]);
    }

    #[test]
    fn pause_sequence_is_swallowed() {
        let events = frame(&[0xE1, 0x14, 0x77, 0xE1, 0xF0, 0x14, 0xF0, 0x77, 0x16]);
        assert_eq!(events, [RawKeyEvent::new(DecodeMode::AsciiMake, 0x16)]);
    }
}
