use config::{Config, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use crate::domain::EngineConfig;

use super::Environment;

const CONFIG_DIR: &str = "config";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub inference: InferenceSettings,
    #[serde(default)]
    pub transcription: TranscriptionSettings,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceSettings {
    pub worker_threads: usize,
    pub max_concurrent_jobs: usize,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_concurrent_jobs: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    /// Used when a request omits `model`.
    pub default_model: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            default_model: "faster-whisper/large-v3".to_string(),
        }
    }
}

impl Settings {
    /// Layers `config/base.yaml`, `config/<environment>.yaml` and `APP__*`
    /// environment variables, later sources winning.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&format!("{}/base", CONFIG_DIR)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", CONFIG_DIR, environment.as_str()))
                    .required(false),
            )
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
