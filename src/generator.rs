use futures::stream::BoxStream;
use tracing::{error, info};

use crate::{
    error::ServiceError,
    inference::{OllamaClient, StreamChunk},
    types::{GenerationRequest, HealthReport, HealthStatus, ModelsResponse},
};

/// Request-level entry points: validation, the connectivity gate and the
/// mapping of backend failures onto [`ServiceError`].
pub struct ArticleGenerator {
    client: OllamaClient,
}

impl ArticleGenerator {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub async fn health(&self) -> HealthReport {
        let probe = self.client.probe().await;
        let connected = probe.is_ok();
        HealthReport {
            status: if connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            connected,
            model: self.client.model().to_string(),
            error: probe.err().map(|err| err.to_string()),
        }
    }

    async fn admit(&self, request: &GenerationRequest) -> Result<(), ServiceError> {
        if !request.has_topic() {
            return Err(ServiceError::BadRequest("Topic cannot be empty".into()));
        }
        if !self.client.check_connection().await {
            return Err(ServiceError::BackendUnavailable);
        }
        Ok(())
    }

    pub async fn generate_article(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        self.admit(&request).await?;

        let article = self.client.generate(&request).await.map_err(|err| {
            error!(error = %err, topic = %request.topic, "article generation failed");
            ServiceError::Generation(err)
        })?;
        info!(chars = article.len(), "article generated");
        Ok(article)
    }

    /// Validation and the connectivity gate run before the stream is returned;
    /// once it is, failures arrive in-band as [`StreamChunk::Error`].
    pub async fn generate_article_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<BoxStream<'static, StreamChunk>, ServiceError> {
        self.admit(&request).await?;
        Ok(self.client.generate_stream(&request))
    }

    pub async fn models(&self) -> ModelsResponse {
        match self.client.fetch_models().await {
            Ok(models) => ModelsResponse {
                models: models.into_iter().map(|m| m.name).collect(),
                error: None,
            },
            Err(err) => {
                error!(error = %err, "failed to get models");
                ModelsResponse {
                    models: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
