/// Scaffold mode serves canned transcripts from an in-process runtime so the
/// gateway runs without inference workers.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldConfig {
    pub enabled: bool,
}

impl ScaffoldConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCAFFOLD_MODE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
