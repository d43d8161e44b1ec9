use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::application::ports::{AdapterError, RuntimeError};
use crate::domain::{Segment, Task, Transcript, Word};

/// Engine-neutral view of one native segment before numbering. Diagnostics
/// an engine does not report stay at zero.
#[derive(Debug, Clone, Default)]
pub(crate) struct SegmentDraft {
    pub seek: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<i64>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
    pub words: Option<Vec<Word>>,
}

/// Assigns 0-based ids in emission order, ignoring engine-native numbering,
/// and applies the word policy: words are attached only when requested, and
/// then always present, empty if the engine had none.
#[derive(Debug)]
pub(crate) struct SegmentNumbering {
    next_id: usize,
    word_timestamps: bool,
}

impl SegmentNumbering {
    pub fn new(word_timestamps: bool) -> Self {
        Self {
            next_id: 0,
            word_timestamps,
        }
    }

    pub fn number(&mut self, draft: SegmentDraft) -> Segment {
        let id = self.next_id;
        self.next_id += 1;

        let words = if self.word_timestamps {
            Some(draft.words.unwrap_or_default())
        } else {
            None
        };

        Segment {
            id,
            seek: draft.seek,
            start: draft.start,
            end: draft.end,
            text: draft.text,
            tokens: draft.tokens,
            temperature: draft.temperature,
            avg_logprob: draft.avg_logprob,
            compression_ratio: draft.compression_ratio,
            no_speech_prob: draft.no_speech_prob,
            words,
        }
    }
}

pub(crate) struct TranscriptBuilder {
    task: Task,
    numbering: SegmentNumbering,
    segments: Vec<Segment>,
}

impl TranscriptBuilder {
    pub fn new(task: Task, word_timestamps: bool) -> Self {
        Self {
            task,
            numbering: SegmentNumbering::new(word_timestamps),
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, draft: SegmentDraft) {
        let segment = self.numbering.number(draft);
        self.segments.push(segment);
    }

    pub fn last_end(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    pub fn finish(self, language: String, duration: f64) -> Transcript {
        Transcript::new(self.task, language, duration, self.segments)
    }
}

pub(crate) fn decode_native<T: DeserializeOwned>(value: Value) -> Result<T, AdapterError> {
    serde_json::from_value(value)
        .map_err(|e| AdapterError::EngineRuntime(format!("malformed native result: {}", e)))
}

pub(crate) fn runtime_failure(error: RuntimeError) -> AdapterError {
    AdapterError::EngineRuntime(error.to_string())
}

pub(crate) fn millis_to_seconds(millis: f64) -> f64 {
    millis / 1000.0
}
