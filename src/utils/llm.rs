//! # Endpoint or LLM
//!
//! The endpoint consumes a complete prompt (or a list of role-tagged messages) and produces a reply.
//! Pipelines only see the [Generate] trait, so a hosted model and a scripted mock are interchangeable.

pub mod openai;

use std::pin::Pin;
use async_trait::async_trait;
use futures::{stream, Stream};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::utils::postprocess::json::{SchemaError, Structured};

pub use openai::{EndpointConfig, OpenAIEndpoint};

/// Stream of reply chunks.
pub type TextStream = Pin<Box<dyn Stream<Item=Result<String, GenerationError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation endpoint request failed: {0}")]
    Request(#[from] async_openai::error::OpenAIError),
    #[error("generation endpoint returned an empty reply")]
    EmptyReply,
    #[error("generation endpoint unavailable: {0}")]
    Unavailable(String),
}

/// A text-generation endpoint.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Generate the next assistant reply for a conversation.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;

    /// Stream the next assistant reply chunk by chunk. Endpoints that cannot stream yield the whole reply
    /// as one chunk.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, GenerationError> {
        let reply = self.chat(messages).await?;
        Ok(Box::pin(stream::once(async move { Ok(reply) })))
    }
}

/// Generates a reply for a single prompt.
pub async fn generate_text(endpoint: &(impl Generate + ?Sized), prompt: &str) -> Result<String, GenerationError> {
    chat_reply(endpoint, &[ChatMessage::user(prompt)]).await
}

/// Generates the next assistant reply for a conversation. A blank reply is [GenerationError::EmptyReply]
/// whichever endpoint produced it.
pub async fn chat_reply(endpoint: &(impl Generate + ?Sized),
                        messages: &[ChatMessage]) -> Result<String, GenerationError> {
    non_empty(endpoint.chat(messages).await?)
}

pub(crate) fn non_empty(reply: String) -> Result<String, GenerationError> {
    if reply.trim().is_empty() {
        Err(GenerationError::EmptyReply)
    } else {
        Ok(reply)
    }
}

/// Failure of a structured generation.
#[derive(Debug, Error)]
pub enum StructuredError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Appends the JSON format instructions of `T` to the prompt, generates and parses the reply.
pub async fn generate_structured<T: Structured>(endpoint: &(impl Generate + ?Sized),
                                                prompt: &str) -> Result<T, StructuredError> {
    let prompt = format!("{}\n{}", prompt, T::format_instructions());
    let reply = generate_text(endpoint, &prompt).await?;
    debug!("structured reply for {}: {} chars", T::schema_name(), reply.len());
    Ok(T::parse_reply(&reply)?)
}
