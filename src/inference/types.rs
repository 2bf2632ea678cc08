use serde::{Deserialize, Serialize};

/// Sampling options sent with every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
        }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: SamplingOptions,
}

/// Non-streaming `POST /api/generate` response. Other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

/// One NDJSON line of a streaming `POST /api/generate` response.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct StreamLine {
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    pub error: Option<String>,
}

/// `GET /api/tags` response.
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// One item of a relayed generation stream. `Done` always comes last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    Error(String),
    Done,
}

impl StreamChunk {
    /// The JSON object carried by the server-sent event for this chunk.
    pub fn to_event_payload(&self) -> serde_json::Value {
        match self {
            StreamChunk::Text(text) => serde_json::json!({ "chunk": text }),
            StreamChunk::Error(message) => serde_json::json!({ "error": message }),
            StreamChunk::Done => serde_json::json!({ "done": true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_wire_shape() {
        let body = GenerateRequest {
            model: "gemma3:latest".into(),
            prompt: "Write".into(),
            stream: true,
            options: SamplingOptions::default(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gemma3:latest",
                "prompt": "Write",
                "stream": true,
                "options": {
                    "temperature": 0.7,
                    "top_p": 0.9,
                    "top_k": 40,
                    "repeat_penalty": 1.1
                }
            })
        );
    }

    #[test]
    fn tags_response_ignores_extra_fields() {
        let raw = r#"{"models":[{"name":"llama3:8b","size":123,"details":{}},{"name":"gemma3:latest"}]}"#;
        let tags: TagsResponse = serde_json::from_str(raw).unwrap();
        let names: Vec<_> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3:8b", "gemma3:latest"]);
    }

    #[test]
    fn event_payloads() {
        assert_eq!(
            StreamChunk::Text("Hel".into()).to_event_payload().to_string(),
            r#"{"chunk":"Hel"}"#
        );
        assert_eq!(
            StreamChunk::Error("bad".into()).to_event_payload().to_string(),
            r#"{"error":"bad"}"#
        );
        assert_eq!(
            StreamChunk::Done.to_event_payload().to_string(),
            r#"{"done":true}"#
        );
    }
}
