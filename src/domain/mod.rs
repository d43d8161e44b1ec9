mod engine_config;
mod model_identifier;
mod response_format;
mod stream_event;
mod transcript;

pub use engine_config::{
    ConfigValidationError, EngineConfig, EngineSection, EngineSettings, ModelSettings,
};
pub use model_identifier::{Engine, IdentifierError, ModelIdentifier};
pub use response_format::{ResponseFormat, TimestampGranularities, UnsupportedResponseFormat};
pub use stream_event::StreamEvent;
pub use transcript::{Segment, Task, Transcript, Word, concat_segment_text};
