use serde::{Deserialize, Serialize};

/// Wire-level event of an incremental transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "transcript.text.delta")]
    TextDelta { delta: String },
    #[serde(rename = "transcript.text.done")]
    TextDone {
        text: String,
        language: String,
        duration: f64,
    },
}

impl StreamEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::TextDone { .. })
    }
}
