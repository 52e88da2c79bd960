//! Closed, 1-based genomic intervals and the set arithmetic used on exon chains.

use std::cmp::{max, min};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A closed interval `[start, end]` on a chromosome (or on a transcript, for cDNA coordinates).
///
/// Ordering is by `(start, end)`, which is also the order of exon chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Interval {
    pub start: i32,
    pub end: i32,
}

impl Interval {
    /// Build an interval; the endpoints are swapped if given in reverse order.
    #[must_use]
    pub fn new(start: i32, end: i32) -> Self {
        Self {
            start: min(start, end),
            end: max(start, end),
        }
    }

    #[must_use]
    pub fn len(&self) -> i32 {
        self.end - self.start + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Number of bases shared with `other`; zero or negative when disjoint.
    #[must_use]
    pub fn overlap(&self, other: &Interval) -> i32 {
        min(self.end, other.end) - max(self.start, other.start) + 1
    }

    #[must_use]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.overlap(other) > 0
    }

    #[must_use]
    pub fn contains_pos(&self, pos: i32) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// True when `other` lies entirely within `self`.
    #[must_use]
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Gap between two disjoint intervals; zero when they overlap or touch.
    #[must_use]
    pub fn distance(&self, other: &Interval) -> i32 {
        max(0, max(self.start, other.start) - min(self.end, other.end) - 1)
    }
}

impl From<(i32, i32)> for Interval {
    fn from((start, end): (i32, i32)) -> Self {
        Self::new(start, end)
    }
}

impl From<Interval> for (i32, i32) {
    fn from(iv: Interval) -> Self {
        (iv.start, iv.end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Merge overlapping or abutting intervals into a sorted, disjoint list.
#[must_use]
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end + 1 => last.end = max(last.end, iv.end),
            _ => merged.push(iv),
        }
    }
    merged
}

/// Remove every base covered by `cut` from `base`. Both inputs may be unsorted.
#[must_use]
pub fn subtract(base: &[Interval], cut: &[Interval]) -> Vec<Interval> {
    let cut = merge(cut);
    let mut result = Vec::new();
    for iv in merge(base) {
        let mut cursor = iv.start;
        for c in cut.iter().filter(|c| c.overlaps(&iv)) {
            if c.start > cursor {
                result.push(Interval::new(cursor, c.start - 1));
            }
            cursor = max(cursor, c.end + 1);
        }
        if cursor <= iv.end {
            result.push(Interval::new(cursor, iv.end));
        }
    }
    result
}

/// Total number of bases shared by two interval lists.
#[must_use]
pub fn overlap_length(a: &[Interval], b: &[Interval]) -> i32 {
    let a = merge(a);
    let b = merge(b);
    let mut total = 0;
    for x in &a {
        for y in b.iter().filter(|y| y.overlaps(x)) {
            total += x.overlap(y);
        }
    }
    total
}

/// Sum of interval lengths.
#[must_use]
pub fn total_length<'a>(intervals: impl IntoIterator<Item = &'a Interval>) -> i32 {
    intervals.into_iter().map(Interval::len).sum()
}
