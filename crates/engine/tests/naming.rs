use engine::interval::ClipInterval;
use engine::naming::{
    clip_file_name, clip_file_names, grid_layout, is_supported_container, sanitize_upload_name,
    source_stem,
};
use engine::render::{generate_clip_command, AudioSource};
use std::path::{Path, PathBuf};

#[test]
fn clip_names_are_one_based_and_stable() {
    assert_eq!(clip_file_name("holiday", 0), "holiday_clip_1.mp4");
    assert_eq!(
        clip_file_names("holiday", 3),
        vec!["holiday_clip_1.mp4", "holiday_clip_2.mp4", "holiday_clip_3.mp4"]
    );
    assert_eq!(clip_file_names("a", 4), clip_file_names("a", 4));
}

#[test]
fn stems_and_uploads() {
    assert_eq!(source_stem(Path::new("uploads/holiday.mov")), "holiday");
    assert_eq!(sanitize_upload_name("../../etc/passwd").as_deref(), Some("passwd"));
    assert_eq!(sanitize_upload_name("C:\\videos\\a.mp4").as_deref(), Some("a.mp4"));
    assert_eq!(sanitize_upload_name(".."), None);
    assert!(is_supported_container("clip.MP4"));
    assert!(is_supported_container("clip.avi"));
    assert!(!is_supported_container("clip.mkv"));
    assert!(!is_supported_container("clip"));
}

#[test]
fn grid_fills_rows_in_clip_order() {
    let names: Vec<u32> = (1..=7).collect();
    let grid = grid_layout(&names, 3);
    assert_eq!(grid, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    assert_eq!(grid_layout(&names, 1).len(), 7);
}

#[test]
fn replaced_audio_is_mapped_from_second_input() {
    let iv = ClipInterval { index: 1, start: 5.0, end: 10.0 };
    let cmd = generate_clip_command(
        Path::new("in.mp4"),
        &iv,
        &AudioSource::Replaced(PathBuf::from("gen.mp3")),
        PathBuf::from("out/in_clip_2.mp4"),
    );
    let args = cmd.ffmpeg_args.join(" ");
    assert!(args.contains("-ss 5.000000 -t 5.000000 -i in.mp4"));
    assert!(args.contains("-i gen.mp3 -map 0:v:0 -map 1:a:0"));
    assert!(args.ends_with("out/in_clip_2.mp4"));
    assert_eq!(cmd.output_path, PathBuf::from("out/in_clip_2.mp4"));
}

#[test]
fn original_audio_is_optional() {
    let iv = ClipInterval { index: 0, start: 0.0, end: 2.5 };
    let cmd = generate_clip_command(
        Path::new("in.mp4"),
        &iv,
        &AudioSource::Original,
        PathBuf::from("o.mp4"),
    );
    assert!(cmd.ffmpeg_args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
    assert_eq!(cmd.ffmpeg_args.iter().filter(|a| *a == "-i").count(), 1);
}
