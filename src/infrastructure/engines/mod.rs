mod engine_adapter_factory;
mod faster_whisper_adapter;
mod funasr_adapter;
mod model_loading;
mod sensevoice_adapter;
mod transcript_normalizer;

pub use engine_adapter_factory::EngineAdapterFactory;
pub use faster_whisper_adapter::FasterWhisperAdapter;
pub use funasr_adapter::FunAsrAdapter;
pub use sensevoice_adapter::{RichText, SenseVoiceAdapter};
