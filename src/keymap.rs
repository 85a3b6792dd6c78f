//! Scan-code set 2 key names
//!
//! Make and break codes of the same key share one name, so a make/break
//! stream yields the same name twice per keystroke.

use crate::types::RawKeyEvent;

pub const ENTER: &str = "ENTER";
pub const LEFT_SHIFT: &str = "L SHFT";
pub const LEFT_CTRL: &str = "L CTRL";

/// Keys producing a single printable character
const PRINTABLE: &[(u8, &str)] = &[
    (0x1C, "A"), (0x32, "B"), (0x21, "C"), (0x23, "D"), (0x24, "E"),
    (0x2B, "F"), (0x34, "G"), (0x33, "H"), (0x43, "I"), (0x3B, "J"),
    (0x42, "K"), (0x4B, "L"), (0x3A, "M"), (0x31, "N"), (0x44, "O"),
    (0x4D, "P"), (0x15, "Q"), (0x2D, "R"), (0x1B, "S"), (0x2C, "T"),
    (0x3C, "U"), (0x2A, "V"), (0x1D, "W"), (0x22, "X"), (0x35, "Y"),
    (0x1A, "Z"),
    (0x45, "0"), (0x16, "1"), (0x1E, "2"), (0x26, "3"), (0x25, "4"),
    (0x2E, "5"), (0x36, "6"), (0x3D, "7"), (0x3E, "8"), (0x46, "9"),
    (0x0E, "`"), (0x4E, "-"), (0x55, "="), (0x5D, "\\"), (0x54, "["),
    (0x5B, "]"), (0x4C, ";"), (0x52, "'"), (0x41, ","), (0x49, "."),
    (0x4A, "/"),
];

/// Non-printing keys in the base table
const BINARY: &[(u8, &str)] = &[
    (0x29, "SPACE"), (0x66, "BKSP"), (0x0D, "TAB"), (0x58, "CAPS"),
    (0x12, LEFT_SHIFT), (0x14, LEFT_CTRL), (0x11, "L ALT"), (0x59, "R SHFT"),
    (0x5A, ENTER), (0x76, "ESC"),
    (0x05, "F1"), (0x06, "F2"), (0x04, "F3"), (0x0C, "F4"), (0x03, "F5"),
    (0x0B, "F6"), (0x83, "F7"), (0x0A, "F8"), (0x01, "F9"), (0x09, "F10"),
    (0x78, "F11"), (0x07, "F12"),
    (0x7E, "SCROLL"), (0x77, "NUM"),
    (0x7C, "KP *"), (0x7B, "KP -"), (0x79, "KP +"), (0x71, "KP ."),
    (0x70, "KP 0"), (0x69, "KP 1"), (0x72, "KP 2"), (0x7A, "KP 3"),
    (0x6B, "KP 4"), (0x73, "KP 5"), (0x74, "KP 6"), (0x6C, "KP 7"),
    (0x75, "KP 8"), (0x7D, "KP 9"),
];

/// `0xE0`-prefixed keys
const EXTENDED: &[(u8, &str)] = &[
    (0x1F, "L GUI"), (0x14, "R CTRL"), (0x27, "R GUI"), (0x11, "R ALT"),
    (0x2F, "APPS"), (0x70, "INSERT"), (0x6C, "HOME"), (0x7D, "PG UP"),
    (0x71, "DELETE"), (0x69, "END"), (0x7A, "PG DN"), (0x75, "U ARROW"),
    (0x6B, "L ARROW"), (0x72, "D ARROW"), (0x74, "R ARROW"), (0x4A, "KP /"),
    (0x5A, "KP EN"),
];

fn lookup(table: &[(u8, &'static str)], code: u8) -> Option<&'static str> {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Whether a base-table code produces a printable character
pub fn is_printable(code: u8) -> bool {
    lookup(PRINTABLE, code).is_some()
}

/// Canonical name of the key behind `event`, `None` for unknown codes
pub fn key_name(event: RawKeyEvent) -> Option<&'static str> {
    if event.mode.is_extended() {
        lookup(EXTENDED, event.code)
    } else {
        lookup(PRINTABLE, event.code).or_else(|| lookup(BINARY, event.code))
    }
}
