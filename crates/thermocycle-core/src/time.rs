//! Time primitives for the experiment core
//!
//! Instants are wall-clock milliseconds since the Unix epoch, the unit the
//! scheduling layer and the rendering collaborators both speak. Elapsed time
//! is measured in fractional minutes and may be negative (a window can
//! extend before a predicted start).

use std::ops::{Add, Sub};
use std::time::Duration;

use crate::{ThermoError, ThermoResult};

/// Milliseconds per minute, the conversion used for elapsed-time queries.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// A wall-clock instant in milliseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1000)
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Signed distance from `reference` in fractional minutes.
    /// Negative when `self` precedes the reference.
    #[inline]
    pub fn minutes_since(self, reference: Timestamp) -> f64 {
        (self.0 - reference.0) as f64 / MILLIS_PER_MINUTE as f64
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_millis() as i64))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_millis() as i64))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 + rhs.as_millis() as i64)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 - rhs.as_millis() as i64)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        let diff = self.0 - rhs.0;
        if diff >= 0 {
            Duration::from_millis(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({}ms)", self.0)
    }
}

/// The [min, max] instant range currently relevant for trimming and display.
///
/// Recomputed on demand, never owned by an entity: the store trims against
/// it, the theoretical series is regenerated over it, renderers read it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    /// Lower bound; observed points older than this are dropped.
    pub min: Timestamp,
    /// Upper bound; theoretical regeneration stops here.
    pub max: Timestamp,
}

impl TimeWindow {
    /// Create a window, rejecting empty or inverted ranges.
    pub fn new(min: Timestamp, max: Timestamp) -> ThermoResult<Self> {
        if min >= max {
            return Err(ThermoError::InvalidWindow(format!(
                "window min {:?} must precede max {:?}",
                min, max
            )));
        }
        Ok(TimeWindow { min, max })
    }

    /// Window of `span` centered on `center`.
    pub fn centered(center: Timestamp, span: Duration) -> Self {
        let half = span / 2;
        TimeWindow {
            min: center.saturating_sub(half),
            max: center.saturating_add(half),
        }
    }

    #[inline]
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.min && t <= self.max
    }

    #[inline]
    pub fn span(&self) -> Duration {
        self.max - self.min
    }
}
