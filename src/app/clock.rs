//! Clock anchoring.
//!
//! Starts SNTP once after the network attach, waits a bounded number of
//! polls for the first synchronization, and proceeds regardless of the
//! result.  A failed sync only means later timestamps read near 1970.

use core::fmt::Write;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::ports::ClockPort;

/// Formatted wall-clock time (C-locale `%c`, UTC).
pub type Timestamp = heapless::String<32>;

/// Result of [`synchronize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Clock set after `attempts` polls (0 = already synced).
    Synced { attempts: u8 },
    /// Ceiling reached without a sync.
    GaveUp { attempts: u8 },
}

impl SyncOutcome {
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Synced { .. })
    }

    pub fn attempts(self) -> u8 {
        match self {
            Self::Synced { attempts } | Self::GaveUp { attempts } => attempts,
        }
    }
}

/// Begin SNTP against `server` and poll until synced or `max_attempts`
/// sub-intervals have elapsed.
pub fn synchronize(
    clock: &mut impl ClockPort,
    delay: &mut impl DelayNs,
    server: &str,
    poll_interval: Duration,
    max_attempts: u8,
) -> SyncOutcome {
    if let Err(e) = clock.begin_sync(server) {
        warn!("Clock: SNTP start against '{}' failed ({}), continuing unsynced", server, e);
        return SyncOutcome::GaveUp { attempts: 0 };
    }
    info!("Clock: SNTP started against '{}'", server);

    if clock.is_synced() {
        return SyncOutcome::Synced { attempts: 0 };
    }

    let interval_ms = u32::try_from(poll_interval.as_millis()).unwrap_or(u32::MAX);
    for attempt in 1..=max_attempts {
        delay.delay_ms(interval_ms);
        if clock.is_synced() {
            return SyncOutcome::Synced { attempts: attempt };
        }
        info!("Clock: waiting for system time to be set... ({}/{})", attempt, max_attempts);
    }

    warn!("Clock: no sync after {} polls, timestamps will be unanchored", max_attempts);
    SyncOutcome::GaveUp { attempts: max_attempts }
}

/// Current time of `clock` as a [`Timestamp`].
pub fn now_formatted(clock: &impl ClockPort) -> Timestamp {
    format_timestamp(clock.now_epoch_secs())
}

/// Format Unix seconds as `Thu Jan  1 00:00:00 1970`.
pub fn format_timestamp(epoch_secs: i64) -> Timestamp {
    let mut out = Timestamp::new();
    match chrono::DateTime::from_timestamp(epoch_secs, 0) {
        Some(dt) => {
            // `%c` never exceeds 24 bytes for four-digit years.
            let _ = write!(out, "{}", dt.format("%c"));
        }
        None => {
            let _ = out.push_str("<invalid time>");
        }
    }
    out
}
