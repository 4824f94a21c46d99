use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// Minimal closed range covering a set of timestamps.
///
/// An empty range covers nothing; adding the first value makes it a
/// zero-length range at that value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    bounds: Option<(Timestamp, Timestamp)>,
}

impl TimeRange {
    /// An empty range.
    pub const fn empty() -> Self {
        Self { bounds: None }
    }

    /// A range spanning `min..=max`. The arguments are reordered if needed.
    pub fn from_values(a: Timestamp, b: Timestamp) -> Self {
        Self {
            bounds: Some((a.min(b), a.max(b))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn min(&self) -> Option<Timestamp> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<Timestamp> {
        self.bounds.map(|(_, max)| max)
    }

    /// Span in milliseconds; zero for an empty range.
    pub fn duration(&self) -> f64 {
        self.bounds.map_or(0.0, |(min, max)| max.since(min))
    }

    /// Grow the range to include `ts`.
    pub fn add_value(&mut self, ts: Timestamp) {
        self.bounds = Some(match self.bounds {
            None => (ts, ts),
            Some((min, max)) => (min.min(ts), max.max(ts)),
        });
    }

    /// Grow the range to include all of `other`.
    pub fn add_range(&mut self, other: &TimeRange) {
        if let Some((min, max)) = other.bounds {
            self.add_value(min);
            self.add_value(max);
        }
    }

    /// Whether `ts` lies within `min..=max`.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.bounds
            .is_some_and(|(min, max)| min <= ts && ts <= max)
    }

    /// Move both ends by `amount` milliseconds.
    pub fn shift(&mut self, amount: f64) {
        if let Some((min, max)) = self.bounds {
            self.bounds = Some((min.shifted(amount), max.shifted(amount)));
        }
    }

    pub fn reset(&mut self) {
        self.bounds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: f64) -> Timestamp {
        Timestamp::from_ms(ms)
    }

    #[test]
    fn empty_range_has_no_bounds() {
        let r = TimeRange::empty();
        assert!(r.is_empty());
        assert_eq!(r.min(), None);
        assert_eq!(r.duration(), 0.0);
        assert!(!r.contains(ts(0.0)));
    }

    #[test]
    fn add_value_grows_both_ends() {
        let mut r = TimeRange::empty();
        r.add_value(ts(10.0));
        assert_eq!((r.min(), r.max()), (Some(ts(10.0)), Some(ts(10.0))));
        r.add_value(ts(4.0));
        r.add_value(ts(20.0));
        assert_eq!((r.min(), r.max()), (Some(ts(4.0)), Some(ts(20.0))));
        assert_eq!(r.duration(), 16.0);
    }

    #[test]
    fn add_range_ignores_empty() {
        let mut r = TimeRange::from_values(ts(5.0), ts(1.0));
        r.add_range(&TimeRange::empty());
        assert_eq!(r, TimeRange::from_values(ts(1.0), ts(5.0)));
        r.add_range(&TimeRange::from_values(ts(3.0), ts(9.0)));
        assert_eq!(r.max(), Some(ts(9.0)));
    }

    #[test]
    fn reset_empties() {
        let mut r = TimeRange::from_values(ts(1.0), ts(2.0));
        assert!(r.contains(ts(2.0)));
        r.reset();
        assert!(r.is_empty());
    }

    #[test]
    fn shift_moves_both_ends() {
        let mut r = TimeRange::from_values(ts(1.0), ts(2.0));
        r.shift(10.0);
        assert_eq!(r, TimeRange::from_values(ts(11.0), ts(12.0)));

        let mut empty = TimeRange::empty();
        empty.shift(10.0);
        assert!(empty.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn covers_exactly_the_extremes(values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..64)) {
            let mut r = TimeRange::empty();
            for v in &values {
                r.add_value(ts(*v));
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            proptest::prop_assert_eq!(r.min(), Some(ts(min)));
            proptest::prop_assert_eq!(r.max(), Some(ts(max)));
            for v in &values {
                proptest::prop_assert!(r.contains(ts(*v)));
            }
        }
    }
}
