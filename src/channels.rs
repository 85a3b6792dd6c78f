//! Interrupt-to-task event channels
//!
//! Every acquisition driver owns one [`EventChannel`]. Its interrupt handler
//! posts small value events with [`EventChannel::post`], which never blocks,
//! and a single task waits on [`EventChannel::receive`] or
//! [`EventChannel::recv`].
//!
//! The queue is an embassy [`Channel`] over a critical-section raw mutex: the
//! ring buffer is only ever touched with interrupts disabled, so a handler
//! can never wait on a lock held by a task.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Fixed-capacity FIFO of events, postable from interrupt context
///
/// A post to a full (or closed) channel drops the newest event and returns
/// `false`. Capacity `N` is fixed at compile time.
pub struct EventChannel<T, const N: usize> {
    queue: Channel<CriticalSectionRawMutex, T, N>,
    closed: AtomicBool,
    close_signal: Signal<CriticalSectionRawMutex, ()>,
    dropped: AtomicU32,
}

impl<T, const N: usize> EventChannel<T, N> {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            closed: AtomicBool::new(false),
            close_signal: Signal::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue an event without blocking
    ///
    /// Returns `false` if the event was dropped. Callers in interrupt context
    /// must treat that as normal operation.
    pub fn post(&self, item: T) -> bool {
        if self.is_closed() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self.queue.try_send(item) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Wait for the next event, forever
    pub async fn receive(&self) -> T {
        self.queue.receive().await
    }

    /// Wait for the next event or for the channel to be closed
    ///
    /// Returns `None` once [`close`](Self::close) has been called, even if
    /// events are still queued.
    pub async fn recv(&self) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        match select(self.queue.receive(), self.close_signal.wait()).await {
            Either::First(item) => Some(item),
            Either::Second(()) => None,
        }
    }

    /// Take the next event if one is queued
    pub fn try_receive(&self) -> Option<T> {
        self.queue.try_receive().ok()
    }

    /// Stop delivery and wake the waiting task
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.close_signal.signal(());
    }

    /// Accept events again after a [`close`](Self::close)
    pub fn reopen(&self) {
        self.close_signal.reset();
        self.closed.store(false, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Discard every queued event
    pub fn clear(&self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Events dropped because the channel was full or closed
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T, const N: usize> Default for EventChannel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
