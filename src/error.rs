//! Driver error type

use core::fmt;

/// Errors reported by the acquisition drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The device table has no peripheral with this name
    DeviceNotFound(&'static str),
    /// A microphone was created with a zero-length sample buffer
    EmptyRecordingBuffer,
    /// Push-to-talk must be enabled before waiting for a session
    PushToTalkDisabled,
    /// A session is already recording
    AlreadyRecording,
    /// No session is recording
    NotRecording,
    /// The driver was closed while waiting
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DeviceNotFound(name) => write!(f, "device not found: {}", name),
            Error::EmptyRecordingBuffer => f.write_str("recording buffer is empty"),
            Error::PushToTalkDisabled => f.write_str("push-to-talk is disabled"),
            Error::AlreadyRecording => f.write_str("already recording"),
            Error::NotRecording => f.write_str("not recording"),
            Error::Closed => f.write_str("driver closed"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
