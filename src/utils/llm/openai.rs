//! Endpoint speaking the OpenAI chat completions protocol.
//!
//! Hugging Face serves hosted models through an OpenAI-compatible router, so the same client covers
//! `openai/gpt-oss-20b` on Hugging Face and any OpenAI-style deployment.

use std::env;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
                          ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
                          CreateChatCompletionRequest, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use thiserror::Error;
use url::Url;
use crate::utils::llm::{ChatMessage, Generate, GenerationError, Role, TextStream};

pub const DEFAULT_API_BASE: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
pub const API_KEY_VAR: &str = "HUGGINGFACEHUB_API_TOKEN";
pub const API_BASE_VAR: &str = "PROMPTLINE_API_BASE";
pub const MODEL_VAR: &str = "PROMPTLINE_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("invalid url in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
}

/// Where and how to reach the generation endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub api_base: Url,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl EndpointConfig {
    /// Config for the default hosted model with a user-supplied token.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Reads the config from the environment, loading a `.env` file first if there is one. A given key takes
    /// precedence over `HUGGINGFACEHUB_API_TOKEN`.
    pub fn from_env_with_key(api_key: Option<String>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let api_key = match api_key {
            Some(api_key) => api_key,
            None => env::var(API_KEY_VAR).map_err(|_| ConfigError::MissingVar(API_KEY_VAR))?,
        };
        let mut config = Self::with_api_key(api_key);
        if let Ok(api_base) = env::var(API_BASE_VAR) {
            config.api_base = Url::parse(&api_base)
                .map_err(|source| ConfigError::InvalidUrl { name: API_BASE_VAR, source })?;
        }
        if let Ok(model) = env::var(MODEL_VAR) {
            config.model = model;
        }
        Ok(config)
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// [Generate] implementation backed by `async-openai`.
#[derive(Clone, Debug)]
pub struct OpenAIEndpoint {
    pub client: Client<OpenAIConfig>,
    pub config: EndpointConfig,
}

impl OpenAIEndpoint {
    pub fn new(config: EndpointConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(config.api_base.as_str().trim_end_matches('/'))
            .with_api_key(config.api_key.clone());
        Self {
            client: Client::with_config(openai_config),
            config,
        }
    }

    #[allow(deprecated)]
    fn request(&self, messages: &[ChatMessage], stream: bool) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(self.config.model.as_str()).messages(messages);
        if let Some(temperature) = self.config.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder.max_tokens(max_tokens);
        }
        if stream {
            builder.stream(true);
        }
        builder.build()
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.as_str();
    let message = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl Generate for OpenAIEndpoint {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let request = self.request(messages, false)?;
        debug!("chat completion with {} messages on {}", messages.len(), self.config.model);
        let response = self.client.chat().create(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyReply)
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, GenerationError> {
        let request = self.request(messages, true)?;
        debug!("streaming chat completion with {} messages on {}", messages.len(), self.config.model);
        let stream = self.client.chat().create_stream(request).await?;
        let chunks = stream.filter_map(|item| async move {
            match item {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(GenerationError::from(e))),
            }
        });
        Ok(Box::pin(chunks))
    }
}
