mod http_runtime;
mod mock_runtime;

pub use http_runtime::HttpInferenceRuntime;
pub use mock_runtime::MockInferenceRuntime;
