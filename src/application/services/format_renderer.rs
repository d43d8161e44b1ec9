use std::fmt::Write;

use serde::Serialize;

use crate::domain::{ResponseFormat, Segment, Task, Transcript, Word};

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const VTT_CONTENT_TYPE: &str = "text/vtt; charset=utf-8";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBody {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// `HH:MM:SS,mmm`
    Srt,
    /// `HH:MM:SS.mmm`
    Vtt,
}

#[derive(Serialize)]
struct TextOnly<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct VerboseTranscription<'a> {
    task: Task,
    language: &'a str,
    duration: f64,
    text: &'a str,
    segments: &'a [Segment],
    #[serde(skip_serializing_if = "Option::is_none")]
    words: Option<Vec<&'a Word>>,
}

pub fn render(
    transcript: &Transcript,
    format: ResponseFormat,
) -> Result<RenderedBody, serde_json::Error> {
    let rendered = match format {
        ResponseFormat::Text => RenderedBody {
            content_type: TEXT_CONTENT_TYPE,
            body: transcript.text.clone(),
        },
        ResponseFormat::Json => RenderedBody {
            content_type: JSON_CONTENT_TYPE,
            body: serde_json::to_string(&TextOnly {
                text: &transcript.text,
            })?,
        },
        ResponseFormat::VerboseJson => RenderedBody {
            content_type: JSON_CONTENT_TYPE,
            body: serde_json::to_string(&VerboseTranscription {
                task: transcript.task,
                language: &transcript.language,
                duration: transcript.duration,
                text: &transcript.text,
                segments: &transcript.segments,
                words: transcript
                    .has_word_timestamps()
                    .then(|| transcript.words().collect()),
            })?,
        },
        ResponseFormat::Srt => RenderedBody {
            content_type: TEXT_CONTENT_TYPE,
            body: render_srt(&transcript.segments),
        },
        ResponseFormat::Vtt => RenderedBody {
            content_type: VTT_CONTENT_TYPE,
            body: render_vtt(&transcript.segments),
        },
    };
    Ok(rendered)
}

pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(segment.start, TimestampStyle::Srt),
            format_timestamp(segment.end, TimestampStyle::Srt),
            segment.text
        );
    }
    out
}

pub fn render_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        let _ = write!(
            out,
            "{} --> {}\n{}\n\n",
            format_timestamp(segment.start, TimestampStyle::Vtt),
            format_timestamp(segment.end, TimestampStyle::Vtt),
            segment.text
        );
    }
    out
}

/// Every field is floored, never rounded. Negative and non-finite inputs
/// render as zero.
pub fn format_timestamp(seconds: f64, style: TimestampStyle) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let remainder = seconds % 60.0;
    let whole_seconds = remainder.floor() as u64;
    let millis = (remainder.fract() * 1000.0).floor() as u64;

    let separator = match style {
        TimestampStyle::Srt => ',',
        TimestampStyle::Vtt => '.',
    };

    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, whole_seconds, separator, millis
    )
}
