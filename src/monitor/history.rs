//! Time series history and Y-range engine
//!
//! History is append-only per series identity. Points are kept for hidden
//! series too, so re-enabling one shows everything retained for it. The
//! store is unbounded unless a per-series bound is configured, in which case
//! the oldest points are dropped first.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::monitor::parser::Sample;

/// Relative padding applied around the observed extremes
const RANGE_PADDING: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Y-axis bounds, computed once per metric session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub y_min: f64,
    pub y_max: f64,
}

impl DisplayRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.y_min && value <= self.y_max
    }
}

/// Compute the initial display range for a batch of values
///
/// The observed extremes are padded by 10% of their magnitude. When every
/// value is the same the window is 10% of that value either way, or
/// `[-1, 1]` around zero. Non-finite values are ignored.
pub fn initial_range<I>(values: I) -> DisplayRange
where
    I: IntoIterator<Item = f64>,
{
    let mut bounds: Option<(f64, f64)> = None;
    for value in values.into_iter().filter(|v| v.is_finite()) {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }

    let Some((min, max)) = bounds else {
        return DisplayRange {
            y_min: -1.0,
            y_max: 1.0,
        };
    };

    // A single non-zero value still gets a 10% window from the padding.
    let y_min = min - min.abs() * RANGE_PADDING;
    let y_max = max + max.abs() * RANGE_PADDING;

    if y_min == y_max {
        return DisplayRange {
            y_min: -1.0,
            y_max: 1.0,
        };
    }

    DisplayRange { y_min, y_max }
}

/// Per-series point history plus the locked display range
#[derive(Debug, Default)]
pub struct HistoryStore {
    series: HashMap<String, VecDeque<TimePoint>>,
    range: Option<DisplayRange>,
    max_points: Option<usize>,
}

impl HistoryStore {
    pub fn new(max_points: Option<usize>) -> Self {
        Self {
            series: HashMap::new(),
            range: None,
            max_points,
        }
    }

    pub fn append(&mut self, identity: &str, point: TimePoint) {
        let points = self.series.entry(identity.to_string()).or_default();
        points.push_back(point);

        if let Some(limit) = self.max_points {
            while points.len() > limit {
                points.pop_front();
            }
        }
    }

    /// Append one point per sample, all stamped with `timestamp`
    pub fn append_batch(&mut self, samples: &[Sample], timestamp: DateTime<Utc>) {
        for sample in samples {
            self.append(
                &sample.identity,
                TimePoint {
                    timestamp,
                    value: sample.value,
                },
            );
        }
    }

    pub fn points(&self, identity: &str) -> Option<&VecDeque<TimePoint>> {
        self.series.get(identity)
    }

    /// Number of series with retained points
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn range(&self) -> Option<DisplayRange> {
        self.range
    }

    pub fn is_range_locked(&self) -> bool {
        self.range.is_some()
    }

    /// Lock the display range from the first non-empty batch
    ///
    /// Returns the new range, or `None` when the range was already locked or
    /// the batch is empty.
    pub fn compute_initial_range(&mut self, samples: &[Sample]) -> Option<DisplayRange> {
        if self.range.is_some() || samples.is_empty() {
            return None;
        }
        let range = initial_range(samples.iter().map(|s| s.value));
        self.range = Some(range);
        Some(range)
    }

    /// Drop every point and unlock the display range
    pub fn reset(&mut self) {
        self.series.clear();
        self.range = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn sample(identity: &str, value: f64) -> Sample {
        Sample {
            identity: identity.to_string(),
            value,
        }
    }

    fn assert_range(range: DisplayRange, y_min: f64, y_max: f64) {
        assert!((range.y_min - y_min).abs() < 1e-9, "y_min {} != {}", range.y_min, y_min);
        assert!((range.y_max - y_max).abs() < 1e-9, "y_max {} != {}", range.y_max, y_max);
    }

    #[test]
    fn test_initial_range_padding() {
        assert_range(initial_range([10.0, 20.0]), 9.0, 22.0);
        assert_range(initial_range([-10.0, -5.0]), -11.0, -4.5);
        assert_range(initial_range([-4.0, 6.0]), -4.4, 6.6);
    }

    #[test]
    fn test_initial_range_degenerate() {
        assert_range(initial_range([0.0, 0.0]), -1.0, 1.0);
        assert_range(initial_range([5.0]), 4.5, 5.5);
        assert_range(initial_range([-2.0, -2.0]), -2.2, -1.8);
        assert_range(initial_range([f64::NAN]), -1.0, 1.0);
    }

    #[test]
    fn test_range_is_locked_after_first_batch() {
        let mut store = HistoryStore::new(None);
        assert!(store.compute_initial_range(&[]).is_none());
        assert!(!store.is_range_locked());

        let first = store
            .compute_initial_range(&[sample("m{}", 10.0), sample("m{a}", 20.0)])
            .unwrap();
        assert!(store.is_range_locked());

        assert!(store.compute_initial_range(&[sample("m{}", 1000.0)]).is_none());
        assert_eq!(store.range(), Some(first));
        assert!(!first.contains(1000.0));
    }

    #[test]
    fn test_append_and_reset() {
        let mut store = HistoryStore::new(None);
        store.append_batch(&[sample("m{a}", 1.0), sample("m{b}", 2.0)], at(0));
        store.append_batch(&[sample("m{a}", 3.0)], at(2));
        store.compute_initial_range(&[sample("m{a}", 1.0)]);

        assert_eq!(store.len(), 2);
        let values: Vec<f64> = store.points("m{a}").unwrap().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 3.0]);
        assert_eq!(store.points("m{a}").unwrap()[1].timestamp, at(2));

        store.reset();
        assert!(store.is_empty());
        assert!(!store.is_range_locked());
    }

    #[test]
    fn test_bounded_history_drops_oldest() {
        let mut store = HistoryStore::new(Some(2));
        for i in 0..5 {
            store.append(
                "m{}",
                TimePoint {
                    timestamp: at(i),
                    value: i as f64,
                },
            );
        }
        let values: Vec<f64> = store.points("m{}").unwrap().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 4.0]);
    }
}
