use super::*;

fn segment(idx: usize, duration: i64, tw_early: i64, tw_late: i64) -> TimeWindowSegment {
    TimeWindowSegment::new(
        idx,
        Duration::new(duration),
        Duration::ZERO,
        Duration::new(tw_early),
        Duration::new(tw_late),
        Duration::ZERO,
    )
}

fn matrix(values: &[&[i64]]) -> Matrix<Duration> {
    let mut matrix = Matrix::new(values.len());

    for (row, row_values) in values.iter().enumerate() {
        for (col, &value) in row_values.iter().enumerate() {
            matrix.set(row, col, Duration::new(value));
        }
    }

    matrix
}

#[test]
fn merge_accumulates_travel_and_time_warp() {
    let matrix = matrix(&[&[0, 10], &[10, 0]]);

    let depot = segment(0, 0, 0, 0);
    let late_client = segment(1, 0, 0, 5);

    let merged = TimeWindowSegment::merge(&matrix, depot, late_client);

    assert_eq!(merged.total_time_warp(), Duration::new(5));
}

#[test]
fn waiting_does_not_cause_time_warp() {
    let matrix = matrix(&[&[0, 10], &[10, 0]]);

    let depot = segment(0, 0, 0, 0);
    let early_client = segment(1, 3, 50, 100);

    // arrival at 10, service only from 50: waiting, but no mandatory lateness
    let merged = TimeWindowSegment::merge(&matrix, depot, early_client);
    assert_eq!(merged.total_time_warp(), Duration::ZERO);

    let tail = segment(0, 0, 0, 1_000);
    let closed = TimeWindowSegment::merge(&matrix, merged, tail);
    assert_eq!(closed.total_time_warp(), Duration::ZERO);
}

#[test]
fn merge_is_associative_bit_exact() {
    let matrix = matrix(&[&[0, 4, 9], &[4, 0, 3], &[9, 3, 0]]);

    let cases = [
        (segment(0, 2, 0, 10), segment(1, 5, 3, 8), segment(2, 1, 0, 4)),
        (segment(0, 0, 0, 0), segment(1, 2, 100, 110), segment(2, 3, 5, 20)),
        (segment(0, 7, 2, 3), segment(2, 0, 0, 1), segment(1, 4, 50, 60)),
        (segment(1, 1, 10, 20), segment(0, 1, 0, 5), segment(2, 2, 30, 35)),
    ];

    for (first, second, third) in cases {
        let left = TimeWindowSegment::merge(&matrix, TimeWindowSegment::merge(&matrix, first, second), third);
        let right = TimeWindowSegment::merge(&matrix, first, TimeWindowSegment::merge(&matrix, second, third));

        assert_eq!(left, right);
    }
}

#[test]
fn merge_all_folds_multiple_segments() {
    let matrix = matrix(&[&[0, 4, 9], &[4, 0, 3], &[9, 3, 0]]);

    let segments = [segment(0, 2, 0, 10), segment(1, 5, 3, 8), segment(2, 1, 0, 4)];

    let folded = TimeWindowSegment::merge_all(&matrix, segments);
    let pairwise =
        TimeWindowSegment::merge(&matrix, TimeWindowSegment::merge(&matrix, segments[0], segments[1]), segments[2]);

    assert_eq!(folded, pairwise);
}

#[test]
fn release_time_is_propagated_as_maximum() {
    let matrix = matrix(&[&[0, 1], &[1, 0]]);

    let first = TimeWindowSegment::new(
        0,
        Duration::ZERO,
        Duration::ZERO,
        Duration::ZERO,
        Duration::new(5),
        Duration::new(8),
    );
    let second = segment(1, 0, 0, 100);

    let merged = TimeWindowSegment::merge(&matrix, first, second);

    // the release exceeds the latest feasible start by 3
    assert_eq!(merged.total_time_warp(), Duration::new(3));
}
