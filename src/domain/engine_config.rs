use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::model_identifier::{Engine, ModelIdentifier};

const ROOT_FIELDS: &[&str] = &["engine"];
const SECTION_FIELDS: &[&str] = &[
    "endpoint",
    "device",
    "compute_type",
    "path",
    "extra",
    "models",
];
const MODEL_FIELDS: &[&str] = &["device", "compute_type", "path", "extra"];

const DEFAULT_DEVICE: &str = "cpu";

/// Effective settings used to construct one adapter: engine defaults overlaid
/// with the per-model overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub endpoint: String,
    pub device: String,
    pub compute_type: Option<String>,
    pub path: Option<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    pub endpoint: String,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelSettings>,
}

impl EngineSection {
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            device: default_device(),
            compute_type: None,
            path: None,
            extra: Map::new(),
            models: BTreeMap::new(),
        }
    }

    fn settings_for(&self, model: Option<&ModelSettings>) -> EngineSettings {
        let mut extra = self.extra.clone();
        if let Some(model) = model {
            extra.extend(model.extra.clone());
        }

        EngineSettings {
            endpoint: self.endpoint.clone(),
            device: model
                .and_then(|m| m.device.clone())
                .unwrap_or_else(|| self.device.clone()),
            compute_type: model
                .and_then(|m| m.compute_type.clone())
                .or_else(|| self.compute_type.clone()),
            path: model
                .and_then(|m| m.path.clone())
                .or_else(|| self.path.clone()),
            extra,
        }
    }
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_faster_whisper() -> EngineSection {
    let mut section = EngineSection::with_endpoint("http://127.0.0.1:9101");
    section.compute_type = Some("int8".to_string());
    section
}

fn default_funasr() -> EngineSection {
    EngineSection::with_endpoint("http://127.0.0.1:9102")
}

fn default_sensevoice() -> EngineSection {
    EngineSection::with_endpoint("http://127.0.0.1:9103")
}

/// The `engine` configuration section: one block per known engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "faster-whisper", default = "default_faster_whisper")]
    pub faster_whisper: EngineSection,
    #[serde(default = "default_funasr")]
    pub funasr: EngineSection,
    #[serde(default = "default_sensevoice")]
    pub sensevoice: EngineSection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            faster_whisper: default_faster_whisper(),
            funasr: default_funasr(),
            sensevoice: default_sensevoice(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration key '{key}': {reason}")]
pub struct ConfigValidationError {
    pub key: String,
    pub reason: String,
}

impl ConfigValidationError {
    fn unknown(key: String) -> Self {
        Self {
            key,
            reason: "unknown key".to_string(),
        }
    }

    fn invalid(key: String, reason: &str) -> Self {
        Self {
            key,
            reason: reason.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn section(&self, engine: Engine) -> &EngineSection {
        match engine {
            Engine::FasterWhisper => &self.faster_whisper,
            Engine::FunAsr => &self.funasr,
            Engine::SenseVoice => &self.sensevoice,
        }
    }

    /// Settings for `(engine, name)`. Unconfigured names get the engine
    /// defaults.
    pub fn settings_for(&self, engine: Engine, name: &str) -> EngineSettings {
        let section = self.section(engine);
        section.settings_for(section.models.get(name))
    }

    /// Settings taken from the model entry of `owner` but built for `engine`.
    /// Used when a model name is only configured under another engine.
    pub fn settings_borrowed_from(&self, engine: Engine, owner: Engine, name: &str) -> EngineSettings {
        self.section(engine)
            .settings_for(self.section(owner).models.get(name))
    }

    /// Engines whose `models` table contains `name`.
    pub fn engines_configuring(&self, name: &str) -> Vec<Engine> {
        Engine::ALL
            .into_iter()
            .filter(|e| self.section(*e).models.contains_key(name))
            .collect()
    }

    pub fn identifiers(&self) -> Vec<ModelIdentifier> {
        Engine::ALL
            .into_iter()
            .flat_map(|engine| {
                self.section(engine)
                    .models
                    .keys()
                    .map(move |name| ModelIdentifier::new(engine, name))
            })
            .collect()
    }

    /// Validates a partial update against the schema and returns the merged
    /// configuration. `self` is never touched, so a rejected update leaves
    /// no trace.
    pub fn apply_update(&self, update: &Value) -> Result<EngineConfig, ConfigValidationError> {
        let root = update.as_object().ok_or_else(|| {
            ConfigValidationError::invalid(String::new(), "update must be an object")
        })?;

        for (key, value) in root {
            if !ROOT_FIELDS.contains(&key.as_str()) {
                return Err(ConfigValidationError::unknown(key.clone()));
            }
            validate_engines(value, key)?;
        }

        let mut merged = serde_json::to_value(self)
            .map_err(|e| ConfigValidationError::invalid("engine".to_string(), &e.to_string()))?;
        if let Some(patch) = root.get("engine") {
            deep_merge(&mut merged, patch);
        }

        serde_json::from_value(merged)
            .map_err(|e| ConfigValidationError::invalid("engine".to_string(), &e.to_string()))
    }
}

fn validate_engines(value: &Value, prefix: &str) -> Result<(), ConfigValidationError> {
    let engines = value
        .as_object()
        .ok_or_else(|| ConfigValidationError::invalid(prefix.to_string(), "expected an object"))?;

    for (engine, section) in engines {
        let key = format!("{}.{}", prefix, engine);
        if engine.parse::<Engine>().is_err() {
            return Err(ConfigValidationError::unknown(key));
        }
        validate_section(section, &key)?;
    }
    Ok(())
}

fn validate_section(value: &Value, prefix: &str) -> Result<(), ConfigValidationError> {
    let section = value
        .as_object()
        .ok_or_else(|| ConfigValidationError::invalid(prefix.to_string(), "expected an object"))?;

    for (field, value) in section {
        let key = format!("{}.{}", prefix, field);
        if !SECTION_FIELDS.contains(&field.as_str()) {
            return Err(ConfigValidationError::unknown(key));
        }
        match field.as_str() {
            "endpoint" | "device" => require_string(value, &key)?,
            "compute_type" | "path" => require_optional_string(value, &key)?,
            "extra" => require_object(value, &key)?,
            "models" => {
                let models = value.as_object().ok_or_else(|| {
                    ConfigValidationError::invalid(key.clone(), "expected an object")
                })?;
                for (name, model) in models {
                    validate_model(model, &format!("{}.{}", key, name))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_model(value: &Value, prefix: &str) -> Result<(), ConfigValidationError> {
    // null removes the model entry
    if value.is_null() {
        return Ok(());
    }
    let model = value
        .as_object()
        .ok_or_else(|| ConfigValidationError::invalid(prefix.to_string(), "expected an object"))?;

    for (field, value) in model {
        let key = format!("{}.{}", prefix, field);
        if !MODEL_FIELDS.contains(&field.as_str()) {
            return Err(ConfigValidationError::unknown(key));
        }
        match field.as_str() {
            "extra" => require_object(value, &key)?,
            _ => require_optional_string(value, &key)?,
        }
    }
    Ok(())
}

fn require_string(value: &Value, key: &str) -> Result<(), ConfigValidationError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(ConfigValidationError::invalid(key.to_string(), "expected a string"))
    }
}

fn require_optional_string(value: &Value, key: &str) -> Result<(), ConfigValidationError> {
    if value.is_string() || value.is_null() {
        Ok(())
    } else {
        Err(ConfigValidationError::invalid(
            key.to_string(),
            "expected a string or null",
        ))
    }
}

fn require_object(value: &Value, key: &str) -> Result<(), ConfigValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ConfigValidationError::invalid(key.to_string(), "expected an object"))
    }
}

fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                    continue;
                }
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
