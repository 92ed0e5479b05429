//! Nanosecond timestamps, durations and half-open bounds.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Signed nanoseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Time(i64);

/// Signed nanosecond duration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Duration(i64);

impl Time {
    pub const MIN: Time = Time(i64::MIN);
    pub const MAX: Time = Time(i64::MAX);

    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub const fn from_secs(s: i64) -> Self {
        Self(s.saturating_mul(1_000_000_000))
    }

    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Round down to a multiple of `d`, towards negative infinity.
    ///
    /// Non-positive durations leave the time unchanged.
    pub fn truncate(self, d: Duration) -> Time {
        if d.0 <= 0 {
            return self;
        }
        Time(self.0 - self.0.rem_euclid(d.0))
    }

    /// Elapsed duration `self - earlier`, saturating.
    pub fn since(self, earlier: Time) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000) as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos)
    }
}

impl Duration {
    /// Sentinel for an unbounded window.
    pub const INFINITE: Duration = Duration(i64::MAX);
    pub const ZERO: Duration = Duration(0);

    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    pub const fn from_secs(s: i64) -> Self {
        Self(s.saturating_mul(1_000_000_000))
    }

    pub const fn from_mins(m: i64) -> Self {
        Self(m.saturating_mul(60_000_000_000))
    }

    pub const fn nanos(self) -> i64 {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self == Self::INFINITE
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add<Duration> for Time {
    type Output = Time;
    fn add(self, d: Duration) -> Time {
        Time(self.0.saturating_add(d.0))
    }
}

impl Sub<Duration> for Time {
    type Output = Time;
    fn sub(self, d: Duration) -> Time {
        Time(self.0.saturating_sub(d.0))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => write!(f, "{}ns", self.0),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "inf");
        }
        write!(f, "{}ns", self.0)
    }
}

/// Half-open interval `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub start: Time,
    pub stop: Time,
}

impl Bounds {
    pub const fn new(start: Time, stop: Time) -> Self {
        Self { start, stop }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.stop
    }

    /// Restrict `self` to `outer`.
    pub fn clip(&self, outer: &Bounds) -> Bounds {
        Bounds {
            start: self.start.max(outer.start),
            stop: self.stop.min(outer.stop),
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}
