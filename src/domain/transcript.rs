use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[default]
    Transcribe,
    Translate,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcribe" => Ok(Task::Transcribe),
            "translate" => Ok(Task::Translate),
            other => Err(format!("Invalid task: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "word")]
    pub text: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: usize,
    pub seek: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<i64>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
    /// `None` when word timestamps were not requested; `Some(vec![])` when they
    /// were requested but the engine produced none for this segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

/// Engine-agnostic transcription result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub task: Task,
    pub language: String,
    pub duration: f64,
    pub text: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Builds a transcript whose `text` is the trimmed concatenation of the
    /// segment texts, in the order given.
    pub fn new(task: Task, language: String, duration: f64, segments: Vec<Segment>) -> Self {
        let text = concat_segment_text(&segments);
        Self {
            task,
            language,
            duration,
            text,
            segments,
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.segments
            .iter()
            .filter_map(|s| s.words.as_deref())
            .flatten()
    }

    pub fn has_word_timestamps(&self) -> bool {
        self.segments.iter().any(|s| s.words.is_some())
    }
}

pub fn concat_segment_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}
