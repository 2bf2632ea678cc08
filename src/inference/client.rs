use std::{sync::Arc, time::Duration};

use async_stream::try_stream;
use futures::{StreamExt, stream::BoxStream};
use reqwest::{Client as HttpClient, StatusCode};
use tracing::{debug, info, warn};

use crate::{
    cleaner::clean_article,
    config::OllamaConfig,
    error::InferenceError,
    inference::{
        stream::{ndjson_lines, relay_increments, with_terminal_marker},
        types::{
            GenerateRequest, GenerateResponse, ModelDescriptor, SamplingOptions, StreamChunk,
            TagsResponse,
        },
    },
    prompt::PromptBuilder,
    types::GenerationRequest,
};

/// Client for a single Ollama backend. Holds only immutable configuration,
/// so clones can be handed to concurrent requests freely.
#[derive(Clone)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    model: String,
    probe_timeout: Duration,
    generation_timeout: Duration,
    max_malformed_lines: Option<usize>,
    sampling: SamplingOptions,
    prompts: Arc<PromptBuilder>,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig, prompts: Arc<PromptBuilder>) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(config.probe_timeout)
            .build()
            .map_err(|e| InferenceError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            probe_timeout: config.probe_timeout,
            generation_timeout: config.generation_timeout,
            max_malformed_lines: config.max_malformed_lines,
            sampling: SamplingOptions::default(),
            prompts,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn generate_body(&self, request: &GenerationRequest, stream: bool) -> GenerateRequest {
        let prompt = self.prompts.build(
            &request.topic,
            request.length,
            request.style,
            request.tone,
        );
        GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream,
            options: self.sampling,
        }
    }

    /// Probes the model-listing endpoint. Only HTTP 200 counts as reachable.
    pub async fn probe(&self) -> Result<(), InferenceError> {
        let url = self.tags_url();
        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&url, self.probe_timeout, e))?;

        if response.status() != StatusCode::OK {
            return Err(InferenceError::Http {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub async fn check_connection(&self) -> bool {
        match self.probe().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, base_url = %self.base_url, "Ollama connection check failed");
                false
            }
        }
    }

    pub async fn fetch_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let url = self.tags_url();
        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&url, self.probe_timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| InferenceError::Decode {
            reason: e.to_string(),
        })?;
        Ok(tags.models)
    }

    /// Model names in backend order; any failure yields an empty list.
    pub async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.fetch_models().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to get available models");
            Vec::new()
        })
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, InferenceError> {
        let url = self.generate_url();
        let body = self.generate_body(request, false);
        info!(model = %body.model, topic = %request.topic, "generating article");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(self.generation_timeout)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&url, self.generation_timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %body, "Ollama rejected generation");
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    after_secs: self.generation_timeout.as_secs(),
                }
            } else {
                InferenceError::Decode {
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(clean_article(&generated.response))
    }

    /// Opens a streaming generation and relays its text increments. The
    /// connection is opened on first poll and closed when the stream is
    /// dropped. The last item is always [`StreamChunk::Done`].
    pub fn generate_stream(&self, request: &GenerationRequest) -> BoxStream<'static, StreamChunk> {
        let url = self.generate_url();
        let body = self.generate_body(request, true);
        let http = self.http.clone();
        let generation_timeout = self.generation_timeout;
        let max_malformed_lines = self.max_malformed_lines;
        info!(model = %body.model, topic = %request.topic, "streaming article");

        let increments = try_stream! {
            let send = http.post(&url).json(&body).send();
            let response = tokio::time::timeout(generation_timeout, send)
                .await
                .map_err(|_| InferenceError::Timeout {
                    after_secs: generation_timeout.as_secs(),
                })?
                .map_err(|e| InferenceError::from_reqwest(&url, generation_timeout, e))?;

            let status = response.status();
            if status != StatusCode::OK {
                let body = tokio::time::timeout(generation_timeout, response.text())
                    .await
                    .ok()
                    .and_then(Result::ok)
                    .unwrap_or_default();
                Err::<(), _>(InferenceError::Http {
                    status: status.as_u16(),
                    body,
                })?;
            } else {
                let lines = ndjson_lines(response.bytes_stream(), generation_timeout);
                for await text in relay_increments(lines, max_malformed_lines) {
                    let text = text?;
                    yield text;
                }
            }
        };

        with_terminal_marker(increments).boxed()
    }
}
