// ---------------------------------------------------------------------------
// Clock: source of timestamps for migration records and backups
// ---------------------------------------------------------------------------

use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond wall clock.  Injected so that migrations stay reproducible
/// under test (two runs with the same clock produce equal documents).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
