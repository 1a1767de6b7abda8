use serde::{Deserialize, Serialize};
use std::fmt;

/// Genomic strand/orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

/// Which annotation a gene (and its transcripts) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    Reference,
    Prediction,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Reference => write!(f, "reference"),
            Provenance::Prediction => write!(f, "prediction"),
        }
    }
}

/// A contiguous genomic interval.
/// Coordinates are 1-based, closed: [start, end]
///
/// `(0, 0)` is the "empty" sentinel used by a locus that has no genes yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval. Panics if start > end.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "Interval requires start <= end");
        Self { start, end }
    }

    pub const EMPTY: Interval = Interval { start: 0, end: 0 };

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    #[inline]
    pub fn len(self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.end - self.start + 1
    }

    #[inline]
    pub fn overlaps(self, other: Interval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start <= other.end && other.start <= self.end
    }

    #[inline]
    pub fn contains(self, other: Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest interval covering both. The empty sentinel is the identity.
    pub fn join(self, other: Interval) -> Interval {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Number of bases shared by both intervals.
    #[inline]
    pub fn intersection_len(self, other: Interval) -> u64 {
        if !self.overlaps(other) {
            return 0;
        }
        self.end.min(other.end) - self.start.max(other.start) + 1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Sort intervals and merge overlapping ones.
///
/// Adjacent (book-ended) intervals are kept apart: `[1,10]` and `[11,20]` are
/// two exons separated by a zero-length intron, not one.
pub fn merge_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(|i| !i.is_empty()).collect();
    if sorted.is_empty() {
        return sorted;
    }

    sorted.sort_by_key(|b| (b.start, b.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    let mut cur = sorted[0];

    for &b in &sorted[1..] {
        if b.start <= cur.end {
            cur.end = cur.end.max(b.end);
        } else {
            merged.push(cur);
            cur = b;
        }
    }
    merged.push(cur);

    merged
}

/// Total number of bases covered by a set of sorted, merged intervals.
pub fn total_len(intervals: &[Interval]) -> u64 {
    intervals.iter().map(|i| i.len()).sum()
}

/// Bases shared by two sorted, merged interval lists.
pub fn shared_len(a: &[Interval], b: &[Interval]) -> u64 {
    let mut i = 0usize;
    let mut j = 0usize;
    let mut shared = 0u64;

    while i < a.len() && j < b.len() {
        shared += a[i].intersection_len(b[j]);
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }

    shared
}
