//! Application supervisor and monitoring
//!
//! Prints the startup banner, keeps uptime and reports the drop counters of
//! the acquisition channels. Dropped events are never errors, but a counter
//! that keeps growing points at a task that is not keeping up.

use crate::config::{
    BARCODE_QUEUE_SIZE, BUTTON_QUEUE_SIZE, MAX_BARCODE_LENGTH, MAX_RECORD_TIME_SECONDS,
    AUDIO_SAMPLE_RATE_HZ, SERVER_HOST, SERVER_PORT,
};

/// Status report interval
pub const STATUS_INTERVAL_SECS: u32 = 60;
/// Supervisor wake-up interval
pub const TICK_SECS: u32 = 10;

/// Events dropped by each acquisition channel since startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionStats {
    pub button_presses_dropped: u32,
    pub key_events_dropped: u32,
    pub push_to_talk_dropped: u32,
}

impl AcquisitionStats {
    pub fn total(&self) -> u32 {
        self.button_presses_dropped
            .saturating_add(self.key_events_dropped)
            .saturating_add(self.push_to_talk_dropped)
    }
}

/// Application supervisor responsible for monitoring
pub struct AppSupervisor {
    uptime_seconds: u32,
    last_heartbeat: u32,
    last_stats: AcquisitionStats,
}

impl AppSupervisor {
    pub const fn new() -> Self {
        Self {
            uptime_seconds: 0,
            last_heartbeat: 0,
            last_stats: AcquisitionStats {
                button_presses_dropped: 0,
                key_events_dropped: 0,
                push_to_talk_dropped: 0,
            },
        }
    }

    pub fn print_startup_banner(&self) {
        info!("========================================");
        info!("FIT v{}", env!("CARGO_PKG_VERSION"));
        info!("Food Inventory Tracker");
        info!("========================================");
        info!("Hardware: RP2040 (Raspberry Pi Pico)");
        info!("Server: {}:{}", SERVER_HOST, SERVER_PORT);
        info!(
            "Queues: buttons={} keys={}",
            BUTTON_QUEUE_SIZE, BARCODE_QUEUE_SIZE
        );
        info!("Barcode: up to {} characters", MAX_BARCODE_LENGTH);
        info!(
            "Recording: up to {}s at {}Hz",
            MAX_RECORD_TIME_SECONDS, AUDIO_SAMPLE_RATE_HZ
        );
        info!("========================================");
    }

    /// Account for `elapsed` seconds; returns `true` when a status report is due
    pub fn tick(&mut self, elapsed: u32) -> bool {
        self.uptime_seconds = self.uptime_seconds.saturating_add(elapsed);
        if self.uptime_seconds - self.last_heartbeat >= STATUS_INTERVAL_SECS {
            self.last_heartbeat = self.uptime_seconds;
            return true;
        }
        false
    }

    /// Log uptime and the drops since the previous report
    ///
    /// Returns the number of events dropped since the previous report.
    pub fn report(&mut self, stats: AcquisitionStats) -> u32 {
        let minutes = self.uptime_seconds / 60;
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;

        if hours > 0 {
            info!("Status: Uptime {}h{}m", hours, remaining_minutes);
        } else {
            info!("Status: Uptime {}m", minutes);
        }

        let new_drops = stats.total().saturating_sub(self.last_stats.total());
        if new_drops > 0 {
            warn!(
                "Status: {} events dropped (buttons={} keys={} push-to-talk={})",
                new_drops,
                stats.button_presses_dropped,
                stats.key_events_dropped,
                stats.push_to_talk_dropped
            );
        }
        self.last_stats = stats;
        new_drops
    }

    /// Run the supervisor loop, sampling `stats` at every report
    #[cfg(feature = "rp2040")]
    pub async fn run(&mut self, stats: impl Fn() -> AcquisitionStats) -> ! {
        use embassy_time::{Duration, Timer};

        info!("Application supervisor started");
        loop {
            Timer::after(Duration::from_secs(TICK_SECS as u64)).await;
            if self.tick(TICK_SECS) {
                self.report(stats());
            }
        }
    }

    pub fn uptime(&self) -> u32 {
        self.uptime_seconds
    }
}

impl Default for AppSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
