//! LLM client abstractions and implementations

pub mod client;
pub mod message;
pub mod providers;

pub use client::{
    cosine_similarity, ChatOptions, Embedder, FinishReason, LlmClient, LlmResponse, Usage,
};
pub use message::{LlmMessage, MessageRole};
pub use providers::*;
