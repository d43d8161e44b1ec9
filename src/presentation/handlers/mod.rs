mod config;
mod error;
mod health;
mod models;
pub mod openai_types;
mod transcriptions;

pub use config::{get_config_handler, update_config_handler};
pub use error::ApiError;
pub use health::health_handler;
pub use models::models_handler;
pub use transcriptions::{transcriptions_handler, translations_handler};
