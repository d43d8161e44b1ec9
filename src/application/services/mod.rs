mod format_renderer;
mod inference_pool;
mod model_registry;
mod stream_encoder;
mod transcription_service;

pub use format_renderer::{
    RenderedBody, TimestampStyle, format_timestamp, render, render_srt, render_vtt,
};
pub use inference_pool::{InferencePool, PoolError, PoolLease};
pub use model_registry::{ModelRegistry, RegistryError};
pub use stream_encoder::{EncoderState, InvalidTransition, StreamEncoder, encode_stream};
pub use transcription_service::{TranscriptionError, TranscriptionService};
