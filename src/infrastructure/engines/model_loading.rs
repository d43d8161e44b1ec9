use std::path::Path;

use crate::application::ports::{
    AdapterError, EngineCapabilities, InferenceRuntime, LoadRequest,
};
use crate::domain::{Engine, EngineSettings, Task};

pub(crate) fn validate_device(
    engine: Engine,
    device: &str,
    allowed: &[&str],
) -> Result<(), AdapterError> {
    let indexed_cuda = device
        .strip_prefix("cuda:")
        .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()));

    if allowed.contains(&device) || (indexed_cuda && allowed.contains(&"cuda:N")) {
        Ok(())
    } else {
        Err(AdapterError::ModelLoad(format!(
            "device '{}' is not supported by {}",
            device, engine
        )))
    }
}

/// An explicitly configured weight path must exist; without one the model
/// name is handed to the worker, which resolves weights on its own.
pub(crate) async fn resolve_weights(
    model: &str,
    settings: &EngineSettings,
) -> Result<String, AdapterError> {
    let Some(path) = settings.path.as_deref() else {
        return Ok(model.to_string());
    };

    match tokio::fs::try_exists(Path::new(path)).await {
        Ok(true) => Ok(path.to_string()),
        Ok(false) => Err(AdapterError::ModelLoad(format!(
            "model weights not found at {}",
            path
        ))),
        Err(e) => Err(AdapterError::ModelLoad(format!(
            "cannot access model weights at {}: {}",
            path, e
        ))),
    }
}

pub(crate) async fn load_model(
    runtime: &dyn InferenceRuntime,
    engine: Engine,
    model: &str,
    settings: &EngineSettings,
    compute_type: Option<&str>,
) -> Result<(), AdapterError> {
    let weights = resolve_weights(model, settings).await?;

    let request = LoadRequest {
        engine,
        model: model.to_string(),
        weights,
        device: settings.device.clone(),
        compute_type: compute_type.map(str::to_string),
        extra: settings.extra.clone(),
    };

    runtime
        .load(&request)
        .await
        .map_err(|e| AdapterError::ModelLoad(e.to_string()))?;

    tracing::info!(
        engine = %engine,
        model = %model,
        device = %request.device,
        weights = %request.weights,
        "Engine model loaded"
    );
    Ok(())
}

pub(crate) fn ensure_task_supported(
    engine: Engine,
    capabilities: EngineCapabilities,
    task: Task,
) -> Result<(), AdapterError> {
    if task == Task::Translate && !capabilities.translation {
        return Err(AdapterError::UnsupportedOperation(format!(
            "{} does not support translation",
            engine
        )));
    }
    Ok(())
}

pub(crate) async fn ensure_audio_readable(audio: &Path) -> Result<(), AdapterError> {
    match tokio::fs::metadata(audio).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(AdapterError::AudioNotFound(format!(
            "{} is not a file",
            audio.display()
        ))),
        Err(e) => Err(AdapterError::AudioNotFound(format!(
            "{}: {}",
            audio.display(),
            e
        ))),
    }
}
