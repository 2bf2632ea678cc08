use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use article_generator_service::{
    AppConfig, ArticleGenerator, OllamaClient, PromptBuilder, build_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        base_url = %config.ollama.base_url,
        model = %config.ollama.model,
        "configuring Ollama backend"
    );

    let prompts = Arc::new(PromptBuilder::new());
    let client = OllamaClient::new(&config.ollama, prompts)?;

    let models = client.list_models().await;
    if models.is_empty() {
        tracing::warn!("Ollama is not reachable or has no models; generation requests will fail until it is");
    } else {
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        tracing::info!(?names, "Ollama models available");
    }

    let generator = Arc::new(ArticleGenerator::new(client));
    let router = build_router(config.clone(), generator);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
