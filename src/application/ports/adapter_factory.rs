use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{EngineSettings, ModelIdentifier};

use super::engine_adapter::{AdapterError, EngineAdapter};

/// Builds a fresh adapter for an identifier. Failures are reported as
/// `AdapterError::ModelLoad`.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(
        &self,
        identifier: &ModelIdentifier,
        settings: &EngineSettings,
    ) -> Result<Arc<dyn EngineAdapter>, AdapterError>;
}
