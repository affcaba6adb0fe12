use engine::{partition, PipelineError};

fn assert_exhaustive(total: f64, count: usize) {
    let intervals = partition(total, count).unwrap();
    assert_eq!(intervals.len(), count);
    assert_eq!(intervals[0].start, 0.0);
    assert_eq!(intervals[count - 1].end, total);
    for (i, pair) in intervals.windows(2).enumerate() {
        assert_eq!(pair[0].end, pair[1].start, "gap or overlap after interval {}", i);
    }
    for (i, iv) in intervals.iter().enumerate() {
        assert_eq!(iv.index, i);
        assert!(iv.end > iv.start);
    }
}

#[test]
fn covers_whole_duration_without_residue() {
    for &total in &[0.1, 1.0, 7.3, 10.0, 59.94, 3600.123_456] {
        for count in 1..=10 {
            assert_exhaustive(total, count);
        }
    }
}

#[test]
fn last_end_is_exact_for_thirds() {
    // 0.1 / 3 * 3 != 0.1 in floating point.
    let intervals = partition(0.1, 3).unwrap();
    assert_eq!(intervals[2].end, 0.1);
}

#[test]
fn single_clip_spans_entire_video() {
    let intervals = partition(12.5, 1).unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, 0.0);
    assert_eq!(intervals[0].end, 12.5);
    assert_eq!(intervals[0].duration(), 12.5);
}

#[test]
fn equal_steps() {
    let intervals = partition(20.0, 4).unwrap();
    let starts: Vec<f64> = intervals.iter().map(|i| i.start).collect();
    assert_eq!(starts, vec![0.0, 5.0, 10.0, 15.0]);
}

#[test]
fn rejects_bad_arguments() {
    assert!(matches!(partition(0.0, 3), Err(PipelineError::InvalidArgument(_))));
    assert!(matches!(partition(-1.0, 3), Err(PipelineError::InvalidArgument(_))));
    assert!(matches!(partition(f64::NAN, 3), Err(PipelineError::InvalidArgument(_))));
    assert!(matches!(partition(10.0, 0), Err(PipelineError::InvalidArgument(_))));
}
