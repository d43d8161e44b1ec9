use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SEPARATOR: char = '/';

/// Inference backends the hub knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    #[serde(rename = "faster-whisper")]
    FasterWhisper,
    #[serde(rename = "funasr")]
    FunAsr,
    #[serde(rename = "sensevoice")]
    SenseVoice,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::FasterWhisper, Engine::FunAsr, Engine::SenseVoice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::FasterWhisper => "faster-whisper",
            Engine::FunAsr => "funasr",
            Engine::SenseVoice => "sensevoice",
        }
    }
}

impl FromStr for Engine {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faster-whisper" => Ok(Engine::FasterWhisper),
            "funasr" => Ok(Engine::FunAsr),
            "sensevoice" => Ok(Engine::SenseVoice),
            other => Err(IdentifierError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid model identifier '{0}': expected '<engine>/<name>'")]
    InvalidIdentifier(String),
    #[error("unsupported engine '{0}': expected one of faster-whisper, funasr, sensevoice")]
    UnsupportedEngine(String),
}

/// A parsed `"<engine>/<name>"` model reference. Only the first `/` separates
/// the engine, so names may themselves contain slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    raw: String,
    engine: Engine,
    name: String,
}

impl ModelIdentifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let (engine, name) = raw
            .split_once(SEPARATOR)
            .ok_or_else(|| IdentifierError::InvalidIdentifier(raw.to_string()))?;

        let engine = engine.parse::<Engine>()?;

        Ok(Self {
            raw: raw.to_string(),
            engine,
            name: name.to_string(),
        })
    }

    pub fn new(engine: Engine, name: &str) -> Self {
        Self {
            raw: format!("{}{}{}", engine.as_str(), SEPARATOR, name),
            engine,
            name: name.to_string(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
