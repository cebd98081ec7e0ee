//! Integer interval arithmetic over token types and code points.
//!
//! Intervals are half-open (`[start, stop)`). An [`IntervalSet`] keeps its
//! intervals sorted, disjoint and non-adjacent, so membership is a binary
//! search and enumeration yields ascending values.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Half-open integer interval `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Interval {
    pub start: i32,
    pub stop: i32,
}

impl Interval {
    #[must_use]
    pub const fn new(start: i32, stop: i32) -> Self {
        Self { start, stop }
    }

    /// Interval holding exactly `value`.
    #[must_use]
    pub const fn single(value: i32) -> Self {
        Self::new(value, value + 1)
    }

    /// Interval covering `first..=last`.
    #[must_use]
    pub const fn inclusive(first: i32, last: i32) -> Self {
        Self::new(first, last + 1)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.stop <= self.start
    }

    #[must_use]
    pub const fn contains(self, value: i32) -> bool {
        value >= self.start && value < self.stop
    }

    #[must_use]
    pub const fn len(self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.stop as i64 - self.start as i64) as usize
        }
    }
}

/// Sorted set of disjoint half-open intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct IntervalSet {
    intervals: SmallVec<[Interval; 2]>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding exactly `value`.
    #[must_use]
    pub fn of(value: i32) -> Self {
        let mut set = Self::new();
        set.add(Interval::single(value));
        set
    }

    /// Set covering `first..=last`.
    #[must_use]
    pub fn of_range(first: i32, last: i32) -> Self {
        let mut set = Self::new();
        set.add(Interval::inclusive(first, last));
        set
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of integers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.iter().map(|i| i.len()).sum()
    }

    pub fn add_one(&mut self, value: i32) {
        self.add(Interval::single(value));
    }

    /// Insert an interval, coalescing it with every interval it overlaps or touches.
    pub fn add(&mut self, interval: Interval) {
        if interval.is_empty() {
            return;
        }

        // First interval that could absorb the new one (its stop reaches our start).
        let first = self.intervals.partition_point(|i| i.stop < interval.start);
        let mut merged = interval;
        let mut last = first;
        while last < self.intervals.len() && self.intervals[last].start <= merged.stop {
            merged.start = merged.start.min(self.intervals[last].start);
            merged.stop = merged.stop.max(self.intervals[last].stop);
            last += 1;
        }

        self.intervals.drain(first..last);
        self.intervals.insert(first, merged);
    }

    /// Remove every integer of `to_remove` from the set.
    ///
    /// An interval that covers `to_remove` exactly at either boundary is
    /// trimmed, never left with an empty or inverted remainder.
    pub fn remove(&mut self, to_remove: Interval) {
        if to_remove.is_empty() {
            return;
        }

        let mut kept: SmallVec<[Interval; 2]> = SmallVec::with_capacity(self.intervals.len() + 1);
        for &existing in &self.intervals {
            if to_remove.stop <= existing.start || to_remove.start >= existing.stop {
                kept.push(existing);
                continue;
            }
            let left = Interval::new(existing.start, to_remove.start);
            let right = Interval::new(to_remove.stop, existing.stop);
            if !left.is_empty() {
                kept.push(left);
            }
            if !right.is_empty() {
                kept.push(right);
            }
        }
        self.intervals = kept;
    }

    pub fn remove_one(&mut self, value: i32) {
        self.remove(Interval::single(value));
    }

    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        let idx = self.intervals.partition_point(|i| i.stop <= value);
        self.intervals
            .get(idx)
            .is_some_and(|interval| interval.contains(value))
    }

    /// Every integer of `[min, max]` (inclusive) that is not in this set.
    #[must_use]
    pub fn complement(&self, min: i32, max: i32) -> Self {
        let mut result = Self::of_range(min, max);
        for &interval in &self.intervals {
            result.remove(interval);
        }
        result
    }

    /// Ascending iterator over the contained integers.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|i| i.start..i.stop)
    }

    /// Flattened list of the contained integers.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.add_one(value);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (n, interval) in self.intervals.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            if interval.len() == 1 {
                write!(f, "{}", interval.start)?;
            } else {
                write!(f, "{}..{}", interval.start, interval.stop - 1)?;
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_coalesces_touching_intervals() {
        let mut set = IntervalSet::new();
        set.add(Interval::new(1, 3));
        set.add(Interval::new(5, 7));
        set.add(Interval::new(3, 5));

        assert_eq!(set.intervals(), &[Interval::new(1, 7)]);
        assert_eq!(set.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_add_keeps_order_for_disjoint_intervals() {
        let mut set = IntervalSet::new();
        set.add(Interval::new(10, 12));
        set.add(Interval::new(1, 2));
        set.add(Interval::new(5, 6));

        assert_eq!(set.to_vec(), vec![1, 5, 10, 11]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_contains() {
        let set: IntervalSet = [1, 2, 3, 7].into_iter().collect();

        assert!(set.contains(1));
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert!(set.contains(7));
        assert!(!set.contains(8));
        assert!(!set.contains(-1));
    }

    #[test]
    fn test_complement_exact_lower_boundary() {
        // [1,3) removed from [1,4]: the split must not leave an empty [1,1).
        let set = IntervalSet::of_range(1, 2);
        let complement = set.complement(1, 4);

        assert_eq!(complement.intervals(), &[Interval::new(3, 5)]);
        assert_eq!(complement.to_vec(), vec![3, 4]);
    }

    #[test]
    fn test_complement_exact_upper_boundary() {
        let set = IntervalSet::of_range(3, 4);
        assert_eq!(set.complement(1, 4).to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_complement_of_whole_universe_is_empty() {
        let set = IntervalSet::of_range(1, 4);
        assert!(set.complement(1, 4).is_empty());
    }

    #[test]
    fn test_complement_single_value() {
        let set = IntervalSet::of(1);
        assert_eq!(set.complement(1, 3).to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_complement_ignores_values_outside_universe() {
        let set: IntervalSet = [-1, 2, 9].into_iter().collect();
        assert_eq!(set.complement(1, 4).to_vec(), vec![1, 3, 4]);
    }

    #[test]
    fn test_remove_splits_interval() {
        let mut set = IntervalSet::of_range(1, 10);
        set.remove(Interval::new(4, 6));

        assert_eq!(set.intervals(), &[Interval::new(1, 4), Interval::new(6, 11)]);
    }

    #[test]
    fn test_remove_spanning_several_intervals() {
        let mut set: IntervalSet = [1, 2, 5, 6, 9].into_iter().collect();
        set.remove(Interval::new(2, 9));

        assert_eq!(set.to_vec(), vec![1, 9]);
    }

    #[test]
    fn test_display() {
        let set: IntervalSet = [1, 2, 3, 7].into_iter().collect();
        assert_eq!(set.to_string(), "{1..3, 7}");
    }
}
