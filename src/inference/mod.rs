//! Client for the Ollama inference backend: connectivity probe, model
//! listing, blocking generation and NDJSON streaming generation.

mod client;
pub mod stream;
mod types;

pub use client::OllamaClient;
pub use types::{
    GenerateRequest, GenerateResponse, ModelDescriptor, SamplingOptions, StreamChunk, StreamLine,
    TagsResponse,
};
