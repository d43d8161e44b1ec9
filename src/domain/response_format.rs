use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
    VerboseJson,
    Srt,
    Vtt,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported response format '{0}': expected one of json, text, verbose_json, srt, vtt")]
pub struct UnsupportedResponseFormat(pub String);

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Text => "text",
            ResponseFormat::VerboseJson => "verbose_json",
            ResponseFormat::Srt => "srt",
            ResponseFormat::Vtt => "vtt",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = UnsupportedResponseFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ResponseFormat::Json),
            "text" => Ok(ResponseFormat::Text),
            "verbose_json" => Ok(ResponseFormat::VerboseJson),
            "srt" => Ok(ResponseFormat::Srt),
            "vtt" => Ok(ResponseFormat::Vtt),
            other => Err(UnsupportedResponseFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which timestamp levels the caller asked for. Segment timing is always
/// produced; `word` toggles per-word timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampGranularities {
    pub segment: bool,
    pub word: bool,
}

impl Default for TimestampGranularities {
    fn default() -> Self {
        Self {
            segment: true,
            word: false,
        }
    }
}

impl TimestampGranularities {
    /// Accepts repeated values as well as comma-separated lists. Unknown
    /// entries are ignored; an empty input keeps the default.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut segment = false;
        let mut word = false;
        let mut seen = false;

        for value in values {
            for item in value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                seen = true;
                match item {
                    "segment" | "segments" => segment = true,
                    "word" | "words" => word = true,
                    other => tracing::debug!(granularity = %other, "Ignoring unknown timestamp granularity"),
                }
            }
        }

        if !seen {
            return Self::default();
        }

        Self { segment, word }
    }
}
