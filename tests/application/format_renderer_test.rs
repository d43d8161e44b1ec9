use asr_hub::application::services::{TimestampStyle, format_timestamp, render, render_srt, render_vtt};
use asr_hub::domain::{ResponseFormat, Task, Transcript, Word};

use crate::helpers::segment;

fn two_segment_transcript() -> Transcript {
    Transcript::new(
        Task::Transcribe,
        "en".to_string(),
        3.5,
        vec![
            segment(0, 0.0, 1.5, " Hello there."),
            segment(1, 1.5, 3.5, " General Kenobi."),
        ],
    )
}

#[test]
fn given_fractional_seconds_when_formatting_then_floors_each_field() {
    assert_eq!(format_timestamp(65.125, TimestampStyle::Srt), "00:01:05,125");
    assert_eq!(format_timestamp(65.125, TimestampStyle::Vtt), "00:01:05.125");
}

#[test]
fn given_hours_when_formatting_then_zero_padded() {
    assert_eq!(format_timestamp(3725.5, TimestampStyle::Srt), "01:02:05,500");
    assert_eq!(format_timestamp(0.0, TimestampStyle::Vtt), "00:00:00.000");
}

#[test]
fn given_negative_or_nan_when_formatting_then_zero() {
    assert_eq!(format_timestamp(-2.0, TimestampStyle::Srt), "00:00:00,000");
    assert_eq!(format_timestamp(f64::NAN, TimestampStyle::Srt), "00:00:00,000");
}

#[test]
fn given_two_segments_when_rendering_srt_then_numbered_blocks() {
    let transcript = two_segment_transcript();

    let srt = render_srt(&transcript.segments);

    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:01,500\n Hello there.\n\n\
         2\n00:00:01,500 --> 00:00:03,500\n General Kenobi.\n\n"
    );
}

#[test]
fn given_two_segments_when_rendering_vtt_then_header_and_dot_timestamps() {
    let transcript = two_segment_transcript();

    let vtt = render_vtt(&transcript.segments);

    assert_eq!(
        vtt,
        "WEBVTT\n\n\
         00:00:00.000 --> 00:00:01.500\n Hello there.\n\n\
         00:00:01.500 --> 00:00:03.500\n General Kenobi.\n\n"
    );
}

#[test]
fn given_no_segments_when_rendering_vtt_then_header_only() {
    assert_eq!(render_vtt(&[]), "WEBVTT\n\n");
    assert_eq!(render_srt(&[]), "");
}

#[test]
fn given_json_format_when_rendering_then_text_only_object() {
    let rendered = render(&two_segment_transcript(), ResponseFormat::Json).unwrap();

    assert_eq!(rendered.content_type, "application/json");
    let value: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
    assert_eq!(value, serde_json::json!({"text": "Hello there. General Kenobi."}));
}

#[test]
fn given_text_format_when_rendering_then_plain_full_text() {
    let rendered = render(&two_segment_transcript(), ResponseFormat::Text).unwrap();

    assert!(rendered.content_type.starts_with("text/plain"));
    assert_eq!(rendered.body, "Hello there. General Kenobi.");
}

#[test]
fn given_verbose_json_without_words_when_rendering_then_no_words_key() {
    let rendered = render(&two_segment_transcript(), ResponseFormat::VerboseJson).unwrap();

    let value: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
    assert_eq!(value["task"], "transcribe");
    assert_eq!(value["language"], "en");
    assert_eq!(value["duration"], 3.5);
    assert_eq!(value["segments"].as_array().unwrap().len(), 2);
    assert!(value.get("words").is_none());
}

#[test]
fn given_verbose_json_with_words_when_rendering_then_top_level_words() {
    let mut first = segment(0, 0.0, 1.0, " Hi");
    first.words = Some(vec![Word {
        start: 0.0,
        end: 1.0,
        text: " Hi".to_string(),
        probability: 0.9,
    }]);
    let mut second = segment(1, 1.0, 2.0, " there");
    second.words = Some(vec![]);
    let transcript = Transcript::new(Task::Transcribe, "en".to_string(), 2.0, vec![first, second]);

    let rendered = render(&transcript, ResponseFormat::VerboseJson).unwrap();

    let value: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
    assert_eq!(value["words"].as_array().unwrap().len(), 1);
    assert_eq!(value["words"][0]["word"], " Hi");
    assert_eq!(value["segments"][1]["words"], serde_json::json!([]));
}

#[test]
fn given_vtt_format_when_rendering_then_vtt_content_type() {
    let rendered = render(&two_segment_transcript(), ResponseFormat::Vtt).unwrap();

    assert!(rendered.content_type.starts_with("text/vtt"));
    assert!(rendered.body.starts_with("WEBVTT\n\n"));
}
