use engine::resolution::{min_duration, time_per_pixel, width_for_duration};
use engine::PipelineError;

#[test]
fn widths_are_multiples_of_eight() {
    let mut d = 0.1;
    while d < 120.0 {
        let w = width_for_duration(d).unwrap();
        assert_eq!(w % 8, 0, "width {} for {}s", w, d);
        assert!(w > 0);
        d += 0.37;
    }
}

#[test]
fn matches_hop_over_sample_rate() {
    // 5 s / (512 / 44100) = 430.66 -> 430 -> 424
    assert_eq!(width_for_duration(5.0).unwrap(), 424);
    // 10 s -> 861.3 -> 856
    assert_eq!(width_for_duration(10.0).unwrap(), 856);
    assert!((time_per_pixel() - 512.0 / 44100.0).abs() < 1e-12);
}

#[test]
fn generated_audio_never_outlasts_clip() {
    for &d in &[0.5, 3.3, 17.0, 42.42] {
        let w = width_for_duration(d).unwrap();
        assert!(w as f64 * time_per_pixel() <= d);
    }
}

#[test]
fn too_short_clips_are_rejected() {
    assert!(matches!(
        width_for_duration(min_duration() * 0.5),
        Err(PipelineError::InvalidArgument(_))
    ));
    assert!(matches!(width_for_duration(0.0), Err(PipelineError::InvalidArgument(_))));
    assert!(matches!(width_for_duration(-2.0), Err(PipelineError::InvalidArgument(_))));
    assert_eq!(width_for_duration(min_duration() * 1.01).unwrap(), 8);
}
