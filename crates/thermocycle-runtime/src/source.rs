//! Host clock sources
//!
//! The runtime reaches the wall clock only through this trait; production
//! uses the system clock, simulations substitute a manually advanced one.

use std::time::{SystemTime, UNIX_EPOCH};

use thermocycle_core::Timestamp;

/// Supplier of the current wall-clock instant.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The host system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp::from_millis(since_epoch.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now();

        assert!(b > a);
    }
}
