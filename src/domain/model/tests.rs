// Unit tests for domain models

use super::*;

#[test]
fn test_time_point_millis_renders_fixed_width() {
    assert_eq!(TimePoint::Millis(0.0).to_fixed_width(), "00:00:00.000");
    assert_eq!(TimePoint::Millis(2_000.0).to_fixed_width(), "00:00:02.000");
    assert_eq!(TimePoint::Millis(3_661_001.0).to_fixed_width(), "01:01:01.001");
}

#[test]
fn test_time_point_timecode_renders_fixed_width() {
    assert_eq!(
        TimePoint::Timecode("0:0:5".to_string()).to_fixed_width(),
        "00:00:05.000"
    );
    assert_eq!(
        TimePoint::Timecode("01:02:03.4".to_string()).to_fixed_width(),
        "01:02:03.400"
    );
}

#[test]
fn test_time_value_deserializes_number_or_text() {
    let options: GifOptions = serde_json::from_str(r#"{"from": 2, "to": "00:00:05"}"#).unwrap();
    assert_eq!(options.from, Some(TimeValue::Seconds(2.0)));
    assert_eq!(options.to, Some(TimeValue::Text("00:00:05".to_string())));
}

#[test]
fn test_loop_key_is_tri_state() {
    let options: GifOptions = serde_json::from_str(r#"{"loop": false}"#).unwrap();
    assert_eq!(options.loop_forever, Some(false));

    let options: GifOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options.loop_forever, None);
}

#[test]
fn test_defaults() {
    let defaults = Defaults::default();
    assert_eq!(defaults.fps, 10);
    assert_eq!(defaults.speed, 1.0);
    assert_eq!(defaults.colors, 80);
    assert_eq!(defaults.compress, 40);
}

#[test]
fn test_bare_path_is_file_input() {
    let input = InputSource::from("clip.mov");
    assert!(!input.is_stream());
    assert_eq!(
        input.file_path().map(|p| p.to_string_lossy().into_owned()),
        Some("clip.mov".to_string())
    );
    assert_eq!(format!("{:?}", InputSource::stream(tokio::io::empty())), "Stream(..)");
}

#[test]
fn test_stage_names() {
    assert_eq!(Stage::Extract.default_program(), "ffmpeg");
    assert_eq!(Stage::Convert.default_program(), "convert");
    assert_eq!(Stage::Optimize.default_program(), "gifsicle");
    assert_eq!(Stage::Optimize.to_string(), "optimize");
    assert_eq!(StageExit::Code(2).to_string(), "exit code 2");
    assert!(StageExit::Success.is_success());
}
