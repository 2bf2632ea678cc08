use serde::{Deserialize, Serialize};

use crate::prompt::{ArticleLength, ArticleStyle, ArticleTone};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub length: ArticleLength,
    #[serde(default)]
    pub style: ArticleStyle,
    #[serde(default)]
    pub tone: ArticleTone,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            length: ArticleLength::default(),
            style: ArticleStyle::default(),
            tone: ArticleTone::default(),
        }
    }

    pub fn has_topic(&self) -> bool {
        !self.topic.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArticleResponse {
    pub fn success(article: String) -> Self {
        Self {
            success: true,
            article: Some(article),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            article: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub connected: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_and_fallbacks() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"topic":"volcanoes","style":"haiku"}"#).unwrap();
        assert_eq!(request.length, ArticleLength::Medium);
        assert_eq!(request.style, ArticleStyle::Informative);
        assert_eq!(request.tone, ArticleTone::Neutral);
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert!(!GenerationRequest::new(" \t\n").has_topic());
        assert!(GenerationRequest::new(" rust ").has_topic());
    }

    #[test]
    fn article_response_omits_absent_fields() {
        let body = serde_json::to_value(ArticleResponse::failure("nope".into())).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "nope"}));
    }
}
