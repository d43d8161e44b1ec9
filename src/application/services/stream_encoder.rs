use futures::stream::Stream;

use crate::application::ports::{AdapterError, SegmentStream};
use crate::domain::{Segment, StreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Idle,
    Streaming,
    Done,
    Aborted,
}

#[derive(Debug, thiserror::Error)]
#[error("stream encoder cannot handle '{event}' in state {state:?}")]
pub struct InvalidTransition {
    pub state: EncoderState,
    pub event: &'static str,
}

/// `Idle -> Streaming -> Done`, or `Streaming -> Aborted` on failure. Emits
/// one delta per segment and a single done event carrying the trimmed
/// accumulated text.
#[derive(Debug)]
pub struct StreamEncoder {
    state: EncoderState,
    language: String,
    duration: f64,
    full_text: String,
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEncoder {
    pub fn new() -> Self {
        Self {
            state: EncoderState::Idle,
            language: String::new(),
            duration: 0.0,
            full_text: String::new(),
        }
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn begin(&mut self, language: &str, duration: f64) -> Result<(), InvalidTransition> {
        self.expect(EncoderState::Idle, "begin")?;
        self.language = language.to_string();
        self.duration = duration;
        self.state = EncoderState::Streaming;
        Ok(())
    }

    pub fn segment(&mut self, segment: &Segment) -> Result<StreamEvent, InvalidTransition> {
        self.expect(EncoderState::Streaming, "segment")?;
        self.full_text.push_str(&segment.text);
        Ok(StreamEvent::TextDelta {
            delta: segment.text.clone(),
        })
    }

    pub fn finish(&mut self) -> Result<StreamEvent, InvalidTransition> {
        self.expect(EncoderState::Streaming, "finish")?;
        self.state = EncoderState::Done;
        Ok(StreamEvent::TextDone {
            text: self.full_text.trim().to_string(),
            language: self.language.clone(),
            duration: self.duration,
        })
    }

    /// Terminal states are left untouched.
    pub fn abort(&mut self) {
        if matches!(self.state, EncoderState::Idle | EncoderState::Streaming) {
            self.state = EncoderState::Aborted;
        }
    }

    fn expect(&self, state: EncoderState, event: &'static str) -> Result<(), InvalidTransition> {
        if self.state == state {
            Ok(())
        } else {
            Err(InvalidTransition {
                state: self.state,
                event,
            })
        }
    }
}

/// Consumes an adapter's segment channel and yields wire events. A segment
/// error ends the stream with that error and no done event.
pub fn encode_stream(
    stream: SegmentStream,
) -> impl Stream<Item = Result<StreamEvent, AdapterError>> + Send + 'static {
    let SegmentStream {
        language,
        duration,
        mut segments,
    } = stream;

    async_stream::stream! {
        let mut encoder = StreamEncoder::new();
        let mut failure = encoder
            .begin(&language, duration)
            .err()
            .map(|e| AdapterError::EngineRuntime(e.to_string()));

        if failure.is_none() {
            while let Some(item) = segments.recv().await {
                match item.and_then(|segment| {
                    encoder
                        .segment(&segment)
                        .map_err(|e| AdapterError::EngineRuntime(e.to_string()))
                }) {
                    Ok(event) => yield Ok(event),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }

        match failure {
            Some(e) => {
                encoder.abort();
                tracing::error!(error = %e, "Transcription stream aborted");
                yield Err(e);
            }
            None => match encoder.finish() {
                Ok(done) => yield Ok(done),
                Err(e) => yield Err(AdapterError::EngineRuntime(e.to_string())),
            },
        }
    }
}
