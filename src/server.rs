use std::{convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::error;

use crate::{
    config::AppConfig,
    error::ServiceError,
    generator::ArticleGenerator,
    types::{ArticleResponse, GenerationRequest, HealthReport, ModelsResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub generator: Arc<ArticleGenerator>,
}

pub fn build_router(config: Arc<AppConfig>, generator: Arc<ArticleGenerator>) -> Router {
    let index = ServeFile::new(config.static_dir.join("index.html"));
    let assets = ServeDir::new(&config.static_dir);
    let state = AppState { config, generator };

    let api = Router::new()
        .route("/health", get(health))
        .route("/generate-article", post(generate_article))
        .route("/generate-article-stream", post(generate_article_stream))
        .route("/models", get(models))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .route_service("/", index)
        .nest_service("/static", assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.generator.health().await)
}

async fn generate_article(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    match state.generator.generate_article(request).await {
        Ok(article) => Ok(Json(ArticleResponse::success(article))),
        Err(ServiceError::Generation(err)) => Ok(Json(ArticleResponse::failure(format!(
            "Failed to generate article: {err}"
        )))),
        Err(other) => Err(other),
    }
}

async fn generate_article_stream(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let chunks = state
        .generator
        .generate_article_stream(request)
        .await
        .inspect_err(|err| error!(error = %err, "streaming article generation rejected"))?;

    let events = chunks.map(|chunk| Ok(Event::default().data(chunk.to_event_payload().to_string())));
    Ok(Sse::new(events))
}

async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.generator.models().await)
}
