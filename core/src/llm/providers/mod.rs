//! Provider implementations

pub mod openai;

pub use openai::{create_client, create_embedder, OpenAiClient, DEFAULT_EMBEDDING_MODEL};
