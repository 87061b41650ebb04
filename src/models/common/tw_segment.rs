#[cfg(test)]
#[path = "../../../tests/unit/models/common/tw_segment_test.rs"]
mod tw_segment_test;

use crate::models::common::{Duration, Matrix};

/// Summarizes the timing of a contiguous subsequence of visits: total duration, mandatory
/// lateness (time warp), and the earliest/latest start which keeps that lateness minimal.
///
/// Segments compose: merging the summaries of two adjacent slices yields the summary of
/// their concatenation, which makes the evaluation of a spliced route an O(1) operation
/// given cached prefix and suffix segments. The merge is associative bit for bit, so
/// callers are free to fold segments in any grouping.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimeWindowSegment {
    idx_first: usize,
    idx_last: usize,
    duration: Duration,
    time_warp: Duration,
    tw_early: Duration,
    tw_late: Duration,
    release: Duration,
}

impl TimeWindowSegment {
    /// Creates a segment describing the single visit with the given index.
    pub fn new(
        idx: usize,
        duration: Duration,
        time_warp: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release: Duration,
    ) -> Self {
        Self { idx_first: idx, idx_last: idx, duration, time_warp, tw_early, tw_late, release }
    }

    /// Merges two adjacent segments into the segment of their concatenation.
    pub fn merge(matrix: &Matrix<Duration>, first: Self, second: Self) -> Self {
        let arc = matrix.at(first.idx_last, second.idx_first);
        let delta = first.duration - first.time_warp + arc;
        let delta_wait = (second.tw_early - delta - first.tw_late).max(Duration::ZERO);
        let delta_tw = (first.tw_early + delta - second.tw_late).max(Duration::ZERO);

        Self {
            idx_first: first.idx_first,
            idx_last: second.idx_last,
            duration: first.duration + second.duration + arc + delta_wait,
            time_warp: first.time_warp + second.time_warp + delta_tw,
            tw_early: (second.tw_early - delta).max(first.tw_early) - delta_wait,
            tw_late: (second.tw_late - delta).min(first.tw_late) + delta_tw,
            release: first.release.max(second.release),
        }
    }

    /// Merges two or more adjacent segments, folding left to right.
    pub fn merge_all(matrix: &Matrix<Duration>, segments: impl IntoIterator<Item = Self>) -> Self {
        let mut iter = segments.into_iter();
        let first = iter.next().expect("cannot merge an empty segment sequence");

        iter.fold(first, |acc, segment| Self::merge(matrix, acc, segment))
    }

    /// Returns the total mandatory lateness of the segment.
    pub fn total_time_warp(&self) -> Duration {
        self.time_warp + (self.release - self.tw_late).max(Duration::ZERO)
    }
}
