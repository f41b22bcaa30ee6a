//! Temporal subsetting over sorted timestamp arrays.

use std::ops::Range;

/// Which boundary [`locate_bound`] searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// First index with `ts[i] >= target`.
    FirstGe,
    /// First index with `ts[i] > target`.
    FirstGt,
}

/// Binary search a non-decreasing timestamp array.
///
/// Returns `None` when no element satisfies the bound.
pub fn locate_bound(ts: &[f64], target: f64, bound: Bound) -> Option<usize> {
    let index = match bound {
        Bound::FirstGe => ts.partition_point(|&t| t < target),
        Bound::FirstGt => ts.partition_point(|&t| t <= target),
    };
    (index < ts.len()).then_some(index)
}

/// Rows of a granule that fall inside a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsettingBounds {
    /// Inclusive row range along axis 0.
    Rows {
        /// First row kept.
        start: usize,
        /// Last row kept.
        end: usize,
    },
    /// No row falls inside the window.
    NoOverlap,
}

impl SubsettingBounds {
    /// Number of rows kept.
    pub fn len(&self) -> usize {
        match self {
            Self::Rows { start, end } => end - start + 1,
            Self::NoOverlap => 0,
        }
    }

    /// Whether no row is kept.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The kept rows as a half-open range.
    pub fn range(&self) -> Option<Range<usize>> {
        match *self {
            Self::Rows { start, end } => Some(start..end + 1),
            Self::NoOverlap => None,
        }
    }
}

/// Rows of `ts` with `start <= ts[i] <= end`, ties included.
pub fn subset(ts: &[f64], start: f64, end: f64) -> SubsettingBounds {
    if ts.is_empty() || start > end {
        return SubsettingBounds::NoOverlap;
    }
    let Some(first) = locate_bound(ts, start, Bound::FirstGe) else {
        return SubsettingBounds::NoOverlap;
    };
    let last = match locate_bound(ts, end, Bound::FirstGt) {
        Some(0) => return SubsettingBounds::NoOverlap,
        Some(index) => index - 1,
        None => ts.len() - 1,
    };
    if last < first {
        return SubsettingBounds::NoOverlap;
    }
    SubsettingBounds::Rows {
        start: first,
        end: last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: [f64; 5] = [10.0, 20.0, 20.0, 30.0, 40.0];

    #[test]
    fn test_locate_bound() {
        assert_eq!(locate_bound(&TS, 20.0, Bound::FirstGe), Some(1));
        assert_eq!(locate_bound(&TS, 20.0, Bound::FirstGt), Some(3));
        assert_eq!(locate_bound(&TS, 5.0, Bound::FirstGe), Some(0));
        assert_eq!(locate_bound(&TS, 40.0, Bound::FirstGt), None);
        assert_eq!(locate_bound(&[], 1.0, Bound::FirstGe), None);
    }

    #[test]
    fn test_ties_are_included() {
        assert_eq!(subset(&TS, 20.0, 20.0), SubsettingBounds::Rows { start: 1, end: 2 });
    }

    #[test]
    fn test_window_before_granule() {
        assert_eq!(subset(&TS, 5.0, 9.0), SubsettingBounds::NoOverlap);
    }

    #[test]
    fn test_window_after_granule() {
        assert_eq!(subset(&TS, 41.0, 50.0), SubsettingBounds::NoOverlap);
    }

    #[test]
    fn test_window_between_samples() {
        assert_eq!(subset(&TS, 21.0, 29.0), SubsettingBounds::NoOverlap);
    }

    #[test]
    fn test_window_covering_granule() {
        let bounds = subset(&TS, 0.0, 100.0);
        assert_eq!(bounds, SubsettingBounds::Rows { start: 0, end: 4 });
        assert_eq!(bounds.len(), 5);
        assert_eq!(bounds.range(), Some(0..5));
    }

    #[test]
    fn test_partial_overlap() {
        assert_eq!(subset(&TS, 15.0, 35.0), SubsettingBounds::Rows { start: 1, end: 3 });
        assert_eq!(subset(&TS, 35.0, 99.0), SubsettingBounds::Rows { start: 4, end: 4 });
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(subset(&[], 0.0, 1.0), SubsettingBounds::NoOverlap);
        assert_eq!(subset(&TS, 30.0, 20.0), SubsettingBounds::NoOverlap);
        assert!(SubsettingBounds::NoOverlap.is_empty());
        assert_eq!(SubsettingBounds::NoOverlap.range(), None);
    }
}
