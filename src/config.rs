use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::bail;

pub const DEFAULT_MODEL: &str = "gemma3:latest";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_MALFORMED_LINES: usize = 16;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub ollama: OllamaConfig,
}

/// Connection settings for the Ollama backend. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub probe_timeout: Duration,
    pub generation_timeout: Duration,
    /// Consecutive malformed stream lines tolerated before the stream fails.
    /// `None` tolerates any number.
    pub max_malformed_lines: Option<usize>,
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            max_malformed_lines: Some(DEFAULT_MAX_MALFORMED_LINES),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8000".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

        let static_dir =
            PathBuf::from(lookup("STATIC_DIR").unwrap_or_else(|| "static".to_string()));

        let base_url = lookup("OLLAMA_BASE_URL").unwrap_or_else(|| {
            let host = lookup("OLLAMA_HOST").unwrap_or_else(|| "localhost".to_string());
            let port = lookup("OLLAMA_PORT").unwrap_or_else(|| "11434".to_string());
            format!("http://{host}:{port}")
        });
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("OLLAMA base url must start with http:// or https://, got {base_url:?}");
        }

        let model = lookup("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            bail!("OLLAMA_MODEL must not be empty");
        }

        let probe_timeout = lookup("OLLAMA_PROBE_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT);
        let generation_timeout = lookup("OLLAMA_GENERATION_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GENERATION_TIMEOUT);
        let max_malformed_lines = match lookup("OLLAMA_MAX_MALFORMED_LINES")
            .and_then(|v| v.parse::<usize>().ok())
        {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => Some(DEFAULT_MAX_MALFORMED_LINES),
        };

        let mut ollama = OllamaConfig::new(base_url, model);
        ollama.probe_timeout = probe_timeout;
        ollama.generation_timeout = generation_timeout;
        ollama.max_malformed_lines = max_malformed_lines;

        Ok(Self {
            listen_addr,
            static_dir,
            ollama,
        })
    }
}
