pub mod cleaner;
pub mod config;
pub mod error;
pub mod generator;
pub mod inference;
pub mod prompt;
pub mod server;
pub mod types;

pub use config::{AppConfig, OllamaConfig};
pub use error::{InferenceError, ServiceError};
pub use generator::ArticleGenerator;
pub use inference::{ModelDescriptor, OllamaClient, StreamChunk};
pub use prompt::PromptBuilder;
pub use server::build_router;
pub use types::GenerationRequest;
