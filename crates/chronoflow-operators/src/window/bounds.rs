//! Bucket assignment for fixed windows.

use chronoflow_core::time::{Bounds, Duration, Time};

/// Assigns timestamps to `[stop - period, stop)` buckets whose stops are
/// spaced `every` apart and aligned to `offset`, clipped to the query bounds.
#[derive(Debug, Clone, Copy)]
pub struct Bucketer {
    every: Duration,
    period: Duration,
    offset: Duration,
    bounds: Bounds,
}

impl Bucketer {
    /// `start` only fixes the alignment: `offset = start - truncate(start, every)`.
    pub fn new(every: Duration, period: Duration, start: Time, bounds: Bounds) -> Self {
        let offset = if every.is_infinite() {
            Duration::ZERO
        } else {
            start.since(start.truncate(every))
        };
        Self {
            every,
            period,
            offset,
            bounds,
        }
    }

    pub fn query_bounds(&self) -> Bounds {
        self.bounds
    }

    /// The earliest bucket whose stop is after `t`.
    fn initial(&self, t: Time) -> Bounds {
        let mut stop = t.truncate(self.every) + self.offset;
        if t >= stop {
            stop = stop + self.every;
        }
        Bounds::new(stop - self.period, stop)
    }

    fn next(&self, b: Bounds) -> Option<Bounds> {
        let n = Bounds::new(b.start + self.every, b.stop + self.every);
        // Saturated at the end of time.
        (n.start > b.start).then_some(n)
    }

    /// Every bucket containing `t`, clipped, earliest first.
    pub fn bounds_for(&self, t: Time) -> Vec<Bounds> {
        if self.every.is_infinite() {
            return vec![self.bounds];
        }
        let mut out = Vec::new();
        let mut b = Some(self.initial(t));
        while let Some(cur) = b.filter(|cur| t >= cur.start) {
            let clipped = cur.clip(&self.bounds);
            if !clipped.is_empty() {
                out.push(clipped);
            }
            b = self.next(cur);
        }
        out
    }

    /// Every bucket overlapping the query bounds, clipped, earliest first.
    pub fn all_bounds(&self) -> Vec<Bounds> {
        if self.bounds.is_empty() {
            return Vec::new();
        }
        if self.every.is_infinite() {
            return vec![self.bounds];
        }
        let mut out = Vec::new();
        let mut b = Some(self.initial(self.bounds.start));
        while let Some(cur) = b.filter(|cur| cur.start < self.bounds.stop) {
            let clipped = cur.clip(&self.bounds);
            if !clipped.is_empty() {
                out.push(clipped);
            }
            b = self.next(cur);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: i64) -> Time {
        Time::from_secs(s)
    }

    fn query() -> Bounds {
        Bounds::new(secs(0), secs(600))
    }

    #[test]
    fn tumbling_assigns_one_bucket() {
        let m = Duration::from_mins(1);
        let b = Bucketer::new(m, m, secs(0), query());
        assert_eq!(b.bounds_for(secs(90)), vec![Bounds::new(secs(60), secs(120))]);
        assert_eq!(b.bounds_for(secs(60)), vec![Bounds::new(secs(60), secs(120))]);
    }

    #[test]
    fn sliding_assigns_overlapping_buckets() {
        let b = Bucketer::new(Duration::from_mins(1), Duration::from_mins(2), secs(0), query());
        assert_eq!(
            b.bounds_for(secs(90)),
            vec![Bounds::new(secs(0), secs(120)), Bounds::new(secs(60), secs(180))]
        );
        // The first bucket starts before the query and gets clipped.
        assert_eq!(
            b.bounds_for(secs(30)),
            vec![Bounds::new(secs(0), secs(60)), Bounds::new(secs(0), secs(120))]
        );
    }

    #[test]
    fn offset_shifts_bucket_edges() {
        let m = Duration::from_mins(1);
        let b = Bucketer::new(m, m, secs(15), query());
        assert_eq!(b.bounds_for(secs(70)), vec![Bounds::new(secs(15), secs(75))]);
        assert_eq!(b.bounds_for(secs(75)), vec![Bounds::new(secs(75), secs(135))]);
    }

    #[test]
    fn all_bounds_covers_the_query() {
        let m = Duration::from_mins(1);
        let b = Bucketer::new(m, m, secs(0), query());
        let all = b.all_bounds();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], Bounds::new(secs(0), secs(60)));
        assert_eq!(all[9], Bounds::new(secs(540), secs(600)));
    }

    #[test]
    fn infinite_window_is_the_query() {
        let b = Bucketer::new(Duration::INFINITE, Duration::INFINITE, secs(0), query());
        assert_eq!(b.bounds_for(secs(42)), vec![query()]);
        assert_eq!(b.all_bounds(), vec![query()]);
    }
}
