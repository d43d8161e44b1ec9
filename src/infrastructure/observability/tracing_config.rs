const DEFAULT_DIRECTIVES: &str = "asr_hub=debug,tower_http=debug";

/// Configuration for tracing initialization.
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    pub level: String,
}

impl TracingConfig {
    /// `LOG_FORMAT=json` forces JSON output regardless of `enable_json`.
    pub fn new(environment: impl Into<String>, level: &str, enable_json: bool) -> Self {
        let defaults = Self::default();
        Self {
            environment: environment.into(),
            json_format: enable_json || defaults.json_format,
            level: level.to_string(),
        }
    }

    pub fn default_filter(&self) -> String {
        format!("{},{}", self.level, DEFAULT_DIRECTIVES)
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            level: "info".to_string(),
        }
    }
}
