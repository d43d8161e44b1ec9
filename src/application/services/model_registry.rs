use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::application::ports::{AdapterError, AdapterFactory, EngineAdapter};
use crate::domain::{
    ConfigValidationError, EngineConfig, EngineSettings, IdentifierError, ModelIdentifier,
};

type PendingAdapter = Shared<BoxFuture<'static, Result<Arc<dyn EngineAdapter>, RegistryError>>>;

struct CachedAdapterEntry {
    settings: EngineSettings,
    adapter: PendingAdapter,
}

struct RegistryState {
    config: EngineConfig,
    entries: HashMap<String, CachedAdapterEntry>,
}

/// Resolves model identifiers to lazily built, cached engine adapters.
///
/// Lookup, publication and eviction all happen under one lock. A construction
/// is published as a shared future before it runs, so concurrent resolvers of
/// the same identifier await the same build instead of starting their own.
/// Failed builds are removed again, leaving nothing cached.
pub struct ModelRegistry {
    factory: Arc<dyn AdapterFactory>,
    state: Mutex<RegistryState>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid model identifier '{0}': expected '<engine>/<name>'")]
    InvalidIdentifier(String),
    #[error("unsupported engine '{0}': expected one of faster-whisper, funasr, sensevoice")]
    UnsupportedEngine(String),
    #[error("model loading failed for '{identifier}': {message}")]
    ModelLoad { identifier: String, message: String },
    #[error(transparent)]
    ConfigValidation(#[from] ConfigValidationError),
}

impl From<IdentifierError> for RegistryError {
    fn from(e: IdentifierError) -> Self {
        match e {
            IdentifierError::InvalidIdentifier(raw) => RegistryError::InvalidIdentifier(raw),
            IdentifierError::UnsupportedEngine(engine) => RegistryError::UnsupportedEngine(engine),
        }
    }
}

impl RegistryError {
    fn model_load(identifier: &ModelIdentifier, error: AdapterError) -> Self {
        let message = match error {
            AdapterError::ModelLoad(message) => message,
            other => other.to_string(),
        };
        RegistryError::ModelLoad {
            identifier: identifier.to_string(),
            message,
        }
    }

    pub fn is_client_fault(&self) -> bool {
        !matches!(self, RegistryError::ModelLoad { .. })
    }
}

impl ModelRegistry {
    pub fn new(factory: Arc<dyn AdapterFactory>, config: EngineConfig) -> Self {
        Self {
            factory,
            state: Mutex::new(RegistryState {
                config,
                entries: HashMap::new(),
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, identifier: &str) -> Result<Arc<dyn EngineAdapter>, RegistryError> {
        let id = ModelIdentifier::parse(identifier)?;

        let pending = {
            let mut state = self.state.lock().await;
            match state.entries.get(identifier) {
                Some(entry) => entry.adapter.clone(),
                None => {
                    let settings = lookup_settings(&state.config, &id);
                    let pending = self.construct(id.clone(), settings.clone());
                    state.entries.insert(
                        identifier.to_string(),
                        CachedAdapterEntry {
                            settings,
                            adapter: pending.clone(),
                        },
                    );
                    pending
                }
            }
        };

        let result = pending.clone().await;

        if let Err(e) = &result {
            let mut state = self.state.lock().await;
            let same_build = state
                .entries
                .get(identifier)
                .is_some_and(|entry| entry.adapter.ptr_eq(&pending));
            if same_build {
                let _ = state.entries.remove(identifier);
            }
            tracing::warn!(error = %e, "Adapter construction failed; nothing cached");
        }

        result
    }

    /// Applies a partial configuration update. Unknown keys reject the whole
    /// update. On success every cached adapter whose effective settings
    /// changed is evicted; it is rebuilt on its next resolve.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(&self, update: &Value) -> Result<EngineConfig, RegistryError> {
        let mut state = self.state.lock().await;

        let config = state.config.apply_update(update).inspect_err(|e| {
            tracing::warn!(key = %e.key, "Rejected configuration update");
        })?;

        let stale: Vec<String> = state
            .entries
            .iter()
            .filter(|(key, entry)| match ModelIdentifier::parse(key) {
                Ok(id) => lookup_settings(&config, &id) != entry.settings,
                Err(_) => true,
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            let _ = state.entries.remove(key);
            tracing::info!(identifier = %key, "Evicted cached adapter after configuration change");
        }

        state.config = config.clone();
        Ok(config)
    }

    pub async fn config(&self) -> EngineConfig {
        self.state.lock().await.config.clone()
    }

    /// Identifiers with a successfully constructed adapter in the cache.
    pub async fn cached_identifiers(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut ids: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry.adapter.peek(), Some(Ok(_))))
            .map(|(key, _)| key.clone())
            .collect();
        ids.sort();
        ids
    }

    fn construct(&self, id: ModelIdentifier, settings: EngineSettings) -> PendingAdapter {
        let factory = Arc::clone(&self.factory);
        async move {
            tracing::info!(
                identifier = %id,
                device = %settings.device,
                "Constructing engine adapter"
            );
            factory
                .create(&id, &settings)
                .await
                .map_err(|e| RegistryError::model_load(&id, e))
        }
        .boxed()
        .shared()
    }
}

/// Settings are keyed by `(engine, name)`. When the name is only configured
/// under another engine, that entry is used but the caller's engine wins.
fn lookup_settings(config: &EngineConfig, id: &ModelIdentifier) -> EngineSettings {
    let engine = id.engine();
    let owners = config.engines_configuring(id.name());

    match owners.first() {
        Some(owner) if !owners.contains(&engine) => {
            tracing::warn!(
                model = %id.name(),
                requested_engine = %engine,
                configured_engine = %owner,
                "Model is configured under a different engine; using the requested engine"
            );
            config.settings_borrowed_from(engine, *owner, id.name())
        }
        _ => config.settings_for(engine, id.name()),
    }
}
