use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use asr_hub::application::ports::AdapterFactory;
use asr_hub::application::services::{InferencePool, ModelRegistry, TranscriptionService};
use asr_hub::infrastructure::engines::EngineAdapterFactory;
use asr_hub::infrastructure::observability::{TracingConfig, init_tracing};
use asr_hub::infrastructure::runtime::MockInferenceRuntime;
use asr_hub::presentation::{AppState, Environment, ScaffoldConfig, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load configuration")?;

    let tracing_config = TracingConfig::new(
        environment.as_str(),
        &settings.logging.level,
        settings.logging.enable_json,
    );
    init_tracing(&tracing_config, settings.server.port);

    let scaffold_config = ScaffoldConfig::from_env();
    let factory: Arc<dyn AdapterFactory> = if scaffold_config.enabled {
        tracing::warn!("Scaffold mode enabled, serving canned transcripts");
        Arc::new(EngineAdapterFactory::with_runtime(Arc::new(
            MockInferenceRuntime::scaffold(),
        )))
    } else {
        Arc::new(EngineAdapterFactory::http(reqwest::Client::new()))
    };

    let registry = Arc::new(ModelRegistry::new(factory, settings.engine.clone()));
    let pool = Arc::new(
        InferencePool::new(
            settings.inference.worker_threads,
            settings.inference.max_concurrent_jobs,
        )
        .context("Failed to start inference pool")?,
    );
    let transcription_service = Arc::new(TranscriptionService::new(registry, pool));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        transcription_service,
        settings: Arc::new(settings),
        scaffold_config,
    };

    let router = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
