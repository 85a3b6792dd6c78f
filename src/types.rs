//! Common types shared by the acquisition drivers and the confirmation workflow

use heapless::String;

use crate::config::MAX_BARCODE_LENGTH;

/// Physical confirmation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Add = 0,
    Remove = 1,
    Cancel = 2,
}

impl Button {
    pub const COUNT: usize = 3;
    pub const ALL: [Button; Button::COUNT] = [Button::Add, Button::Remove, Button::Cancel];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Button::Add => "add",
            Button::Remove => "remove",
            Button::Cancel => "cancel",
        }
    }
}

/// How the PS/2 framer classified a scan code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeMode {
    /// Make code of a key with a printable character
    AsciiMake,
    /// Make code of a non-printing key (shift, enter, F-keys, ...)
    BinaryMake,
    /// `0xE0`-prefixed make code
    LongBinaryMake,
    /// `0xF0`-prefixed break code
    Break,
    /// `0xE0 0xF0`-prefixed break code
    LongBreak,
}

impl DecodeMode {
    /// Whether the code lives in the `0xE0` extended table
    pub const fn is_extended(self) -> bool {
        matches!(self, DecodeMode::LongBinaryMake | DecodeMode::LongBreak)
    }

    pub const fn is_break(self) -> bool {
        matches!(self, DecodeMode::Break | DecodeMode::LongBreak)
    }
}

/// One framed key event, produced in interrupt context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawKeyEvent {
    pub mode: DecodeMode,
    pub code: u8,
}

impl RawKeyEvent {
    pub const fn new(mode: DecodeMode, code: u8) -> Self {
        Self { mode, code }
    }
}

/// Position of the scanner's virtual key, toggled on every accepted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyPosition {
    #[default]
    Up,
    Down,
}

impl KeyPosition {
    pub const fn toggled(self) -> Self {
        match self {
            KeyPosition::Up => KeyPosition::Down,
            KeyPosition::Down => KeyPosition::Up,
        }
    }
}

/// A scanned barcode
///
/// Holds at most [`MAX_BARCODE_LENGTH`] bytes. Key text that does not fit is
/// dropped whole and the barcode is marked truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Barcode {
    text: String<MAX_BARCODE_LENGTH>,
    truncated: bool,
}

impl Barcode {
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            truncated: false,
        }
    }

    /// Append the text of one key press
    ///
    /// Returns `false` and sets the truncated flag if it does not fit.
    pub fn push_key(&mut self, key: &str) -> bool {
        if self.text.push_str(key).is_err() {
            self.truncated = true;
            return false;
        }
        true
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether key text was dropped because the buffer was full
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Barcode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str());
        if self.truncated {
            defmt::write!(f, " (truncated)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_truncates_whole_keys() {
        let mut barcode = Barcode::new();
        for _ in 0..MAX_BARCODE_LENGTH {
            assert!(barcode.push_key("7"));
        }
        assert!(!barcode.push_key("8"));
        assert!(barcode.is_truncated());
        assert_eq!(barcode.len(), MAX_BARCODE_LENGTH);

        barcode.clear();
        assert!(barcode.is_empty());
        assert!(!barcode.is_truncated());
    }

    #[test]
    fn multi_byte_key_is_not_split() {
        let mut barcode = Barcode::new();
        for _ in 0..MAX_BARCODE_LENGTH - 2 {
            barcode.push_key("1");
        }
        assert!(!barcode.push_key("TAB"));
        assert_eq!(barcode.len(), MAX_BARCODE_LENGTH - 2);
    }
}
