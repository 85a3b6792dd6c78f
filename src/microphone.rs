//! Push-to-talk microphone
//!
//! A session is bracketed by two edges of the push-to-talk switch; both
//! edges post the same signal. While recording, the codec interrupt drains
//! the read FIFO into the sample buffer. A full buffer ends the session from
//! inside the interrupt handler so a missed release can never record forever.
//!
//! ```text
//!  Idle --enable_push_to_talk--> Armed --edge--> Recording --edge / full--> Armed
//!   ^                              |
//!   +----disable_push_to_talk------+
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::channels::EventChannel;
use crate::config::PUSH_TO_TALK_QUEUE_SIZE;
use crate::error::{Error, Result};
use crate::hal::{AudioCore, DeviceConfig, DeviceTable, EdgeLine};

/// Samples converted per critical section while exporting
const EXPORT_CHUNK: usize = 64;

/// Recording session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Push-to-talk disabled
    Idle,
    /// Waiting for the push-to-talk edge that starts a session
    Armed,
    /// Capturing samples
    Recording,
}

/// Narrow captured samples to their upper 16 bits
///
/// Returns the number of samples written, `min(samples.len(), out.len())`.
pub fn export_linear16(samples: &[u32], out: &mut [u16]) -> usize {
    let count = samples.len().min(out.len());
    for (dst, &src) in out.iter_mut().zip(samples) {
        *dst = (src >> 16) as u16;
    }
    count
}

/// Serialize linear16 samples as little-endian bytes
///
/// Returns the number of bytes written; stops at the last whole sample that fits.
pub fn linear16_le_bytes(samples: &[u16], out: &mut [u8]) -> usize {
    let mut written = 0;
    for (dst, sample) in out.chunks_exact_mut(2).zip(samples) {
        dst.copy_from_slice(&sample.to_le_bytes());
        written += 2;
    }
    written
}

struct Session<'a, A, S> {
    codec: A,
    switch: S,
    samples: &'a mut [u32],
    /// Next sample to record or play back
    cursor: usize,
    total_samples: usize,
    reading: bool,
    writing: bool,
    push_to_talk_enabled: bool,
    state: SessionState,
}

impl<'a, A: AudioCore, S: EdgeLine> Session<'a, A, S> {
    /// Samples past `total_samples` are never read, so the buffer keeps its stale contents
    fn clear_recording(&mut self) {
        self.cursor = 0;
        self.total_samples = 0;
    }

    fn stop_reading(&mut self) {
        self.codec.disable_read_interrupt();
        self.reading = false;
    }

    fn stop_writing(&mut self) {
        self.codec.disable_write_interrupt();
        self.writing = false;
    }

    fn set_push_to_talk(&mut self, enabled: bool) {
        self.switch.set_interrupt_mask(enabled);
        self.switch.clear_edge_capture();
        self.push_to_talk_enabled = enabled;
    }

    fn settled_state(&self) -> SessionState {
        if self.push_to_talk_enabled {
            SessionState::Armed
        } else {
            SessionState::Idle
        }
    }

    /// Returns `true` when the buffer filled up during this call
    fn service_read(&mut self) -> bool {
        if !self.reading || !self.codec.read_interrupt_pending() {
            return false;
        }

        let start = self.total_samples;
        let remaining = self.samples.len() - start;
        let words_to_read = self.codec.read_available().min(remaining);
        if words_to_read > 0 {
            let words_read = self.codec.read_fifo(&mut self.samples[start..start + words_to_read]);
            self.total_samples += words_read;
            self.cursor = self.total_samples;
        }

        if self.total_samples == self.samples.len() {
            self.stop_reading();
            return true;
        }
        false
    }

    fn service_write(&mut self) {
        if !self.writing || !self.codec.write_interrupt_pending() {
            return;
        }

        let start = self.cursor;
        let remaining = self.total_samples - start;
        let words_to_write = self.codec.write_space().min(remaining);
        if words_to_write > 0 {
            let words_written = self.codec.write_fifo(&self.samples[start..start + words_to_write]);
            self.cursor += words_written;
        }

        if self.cursor == self.total_samples {
            self.stop_writing();
        }
    }
}

/// Push-to-talk microphone driver
pub struct Microphone<'a, A: AudioCore, S: EdgeLine> {
    session: Mutex<CriticalSectionRawMutex, RefCell<Session<'a, A, S>>>,
    push_to_talk: EventChannel<(), PUSH_TO_TALK_QUEUE_SIZE>,
    capacity: usize,
}

impl<'a, A: AudioCore, S: EdgeLine> Microphone<'a, A, S> {
    /// Create from opened peripherals
    ///
    /// Both codec interrupts and the switch interrupt start disabled.
    pub fn new(mut codec: A, mut switch: S, samples: &'a mut [u32]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyRecordingBuffer);
        }

        codec.disable_read_interrupt();
        codec.disable_write_interrupt();
        codec.reset();
        switch.set_interrupt_mask(false);
        switch.clear_edge_capture();

        let capacity = samples.len();
        Ok(Self {
            session: Mutex::new(RefCell::new(Session {
                codec,
                switch,
                samples,
                cursor: 0,
                total_samples: 0,
                reading: false,
                writing: false,
                push_to_talk_enabled: false,
                state: SessionState::Idle,
            })),
            push_to_talk: EventChannel::new(),
            capacity,
        })
    }

    /// Open the audio core and push-to-talk switch named by the device triples
    ///
    /// On failure every handle opened so far is released again.
    pub fn create<T>(
        table: &mut T,
        audio: &DeviceConfig,
        switch: &DeviceConfig,
        samples: &'a mut [u32],
    ) -> Result<Self>
    where
        T: DeviceTable<Audio = A, Line = S>,
    {
        if samples.is_empty() {
            error!("Microphone: empty recording buffer");
            return Err(Error::EmptyRecordingBuffer);
        }

        let Some(mut codec) = table.open_audio(audio) else {
            error!("Microphone: device {} not found", audio.name);
            return Err(Error::DeviceNotFound(audio.name));
        };

        let Some(line) = table.open_line(switch) else {
            error!("Microphone: device {} not found", switch.name);
            codec.disable_read_interrupt();
            codec.disable_write_interrupt();
            return Err(Error::DeviceNotFound(switch.name));
        };

        info!(
            "Microphone: {} on irq {}, push-to-talk on irq {}, {} samples",
            audio.name,
            audio.irq,
            switch.irq,
            samples.len()
        );
        Self::new(codec, line, samples)
    }

    /// Unmask the push-to-talk switch
    ///
    /// Edges left over from a session cut off by a full buffer are discarded.
    /// Does nothing once the microphone has been closed.
    pub fn enable_push_to_talk(&self) {
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            if self.push_to_talk.is_closed() {
                return;
            }
            if session.state != SessionState::Recording {
                self.push_to_talk.clear();
                session.state = SessionState::Armed;
            }
            session.set_push_to_talk(true);
        });
    }

    /// Mask the push-to-talk switch
    pub fn disable_push_to_talk(&self) {
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            session.set_push_to_talk(false);
            if session.state == SessionState::Armed {
                session.state = SessionState::Idle;
            }
        });
    }

    /// Wait for the push-to-talk edge, then start capturing
    pub async fn wait_and_begin_recording(&self) -> Result<()> {
        if self.push_to_talk.is_closed() {
            return Err(Error::Closed);
        }
        match self.state() {
            SessionState::Idle => return Err(Error::PushToTalkDisabled),
            SessionState::Recording => return Err(Error::AlreadyRecording),
            SessionState::Armed => {}
        }

        if self.push_to_talk.recv().await.is_none() {
            self.session.lock(|session| {
                let mut session = session.borrow_mut();
                session.set_push_to_talk(false);
                session.state = SessionState::Idle;
            });
            return Err(Error::Closed);
        }

        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            session.clear_recording();
            session.codec.reset();
            session.reading = true;
            session.state = SessionState::Recording;
            session.codec.enable_read_interrupt();
        });
        info!("Microphone: recording started");
        Ok(())
    }

    /// Wait for the closing push-to-talk edge (or a full buffer), then stop capturing
    ///
    /// Returns the number of captured samples.
    pub async fn wait_and_finish_recording(&self) -> Result<usize> {
        if self.state() != SessionState::Recording {
            return Err(Error::NotRecording);
        }

        let signalled = self.push_to_talk.recv().await;

        let total = self.session.lock(|session| {
            let mut session = session.borrow_mut();
            session.stop_reading();
            let settled = session.settled_state();
            session.state = settled;
            session.total_samples
        });

        signalled.ok_or(Error::Closed)?;
        info!("Microphone: recording finished, {} samples", total);
        Ok(total)
    }

    /// Push-to-talk switch interrupt entry point
    ///
    /// While recording, the read FIFO is drained first so the samples captured
    /// just before the release edge end up in the recording.
    pub fn on_switch_interrupt(&self) {
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            let filled = session.service_read();
            if filled || session.push_to_talk_enabled {
                self.push_to_talk.post(());
            }
            session.switch.clear_edge_capture();
            let _ = session.switch.edge_capture();
        });
    }

    /// Audio core interrupt entry point
    pub fn on_codec_interrupt(&self) {
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            if session.service_read() {
                // Safety cutoff: end the session as if the switch was released
                self.push_to_talk.post(());
            }
            session.service_write();
        });
    }

    /// Export the captured samples as linear16
    ///
    /// Returns the exported count, limited by `out.len()`. The conversion runs
    /// in short critical sections so interrupts stay responsive.
    pub fn export_linear16(&self, out: &mut [u16]) -> usize {
        let count = self.total_samples().min(out.len());
        let mut done = 0;
        while done < count {
            let end = (done + EXPORT_CHUNK).min(count);
            self.session.lock(|session| {
                let session = session.borrow();
                export_linear16(&session.samples[done..end], &mut out[done..end]);
            });
            done = end;
        }
        count
    }

    /// Stream the recording back out through the codec's write FIFO
    pub fn playback(&self) {
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            session.cursor = 0;
            session.codec.reset();
            session.writing = true;
            session.codec.enable_write_interrupt();
        });
        debug!("Microphone: playback started");
    }

    /// Stop capture and release a task blocked on the push-to-talk signal
    ///
    /// Closing is permanent: later `enable_push_to_talk` calls leave the
    /// switch masked.
    pub fn close(&self) {
        self.push_to_talk.close();
        self.session.lock(|session| {
            let mut session = session.borrow_mut();
            session.stop_reading();
            session.set_push_to_talk(false);
        });
    }

    pub fn state(&self) -> SessionState {
        self.session.lock(|session| session.borrow().state)
    }

    pub fn total_samples(&self) -> usize {
        self.session.lock(|session| session.borrow().total_samples)
    }

    pub fn is_reading(&self) -> bool {
        self.session.lock(|session| session.borrow().reading)
    }

    pub fn is_writing(&self) -> bool {
        self.session.lock(|session| session.borrow().writing)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push-to-talk edges dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.push_to_talk.dropped()
    }
}

impl<'a, A: AudioCore, S: EdgeLine> Drop for Microphone<'a, A, S> {
    fn drop(&mut self) {
        let session = self.session.get_mut().get_mut();
        session.stop_reading();
        session.stop_writing();
        session.set_push_to_talk(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear16_keeps_upper_half() {
        let samples = [0x1234_5678, 0xFFFF_0000, 0x0000_FFFF, 0x8000_0001];
        let mut out = [0u16; 4];
        assert_eq!(export_linear16(&samples, &mut out), 4);
        assert_eq!(out, [0x1234, 0xFFFF, 0x0000, 0x8000]);
    }

    #[test]
    fn linear16_limited_by_output() {
        let samples = [0x0001_0000; 8];
        let mut out = [0u16; 3];
        assert_eq!(export_linear16(&samples, &mut out), 3);
        assert_eq!(out, [1, 1, 1]);
    }

    #[test]
    fn little_endian_bytes() {
        let mut out = [0u8; 5];
        assert_eq!(linear16_le_bytes(&[0x1234, 0xABCD, 0x0001], &mut out), 4);
        assert_eq!(out, [0x34, 0x12, 0xCD, 0xAB, 0x00]);
    }
}
