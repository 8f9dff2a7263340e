//! Process-wide storage cooldown.
//!
//! When the storage API reports exhaustion, uploads are refused up front
//! until the reset time passes.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// How long uploads stay blocked after a rate-limit signal.
pub const COOLDOWN: Duration = Duration::hours(1);

/// Shared "reset-not-before" timestamp in unix milliseconds. Zero means open.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    reset_at_ms: AtomicI64,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Err(minutes)` with the remaining wait rounded up while the cooldown is active.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), i64> {
        let remaining = self.reset_at_ms.load(Ordering::Acquire) - now.timestamp_millis();
        if remaining > 0 {
            Err((remaining + 59_999) / 60_000)
        } else {
            Ok(())
        }
    }

    /// Start (or extend) the cooldown from `now`.
    pub fn trip(&self, now: DateTime<Utc>) {
        let reset_at = (now + COOLDOWN).timestamp_millis();
        self.reset_at_ms.fetch_max(reset_at, Ordering::AcqRel);
        warn!("Storage rate limited, uploads paused until {}", now + COOLDOWN);
    }
}
