mod adapter_factory;
mod engine_adapter;
mod inference_runtime;

pub use adapter_factory::AdapterFactory;
pub use engine_adapter::{
    AdapterError, EngineAdapter, EngineCapabilities, SegmentStream, TranscriptionOptions,
};
pub use inference_runtime::{
    InferRequest, InferenceRuntime, LoadRequest, NativeStream, RuntimeError,
};
