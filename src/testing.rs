//! Scripted collaborators for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;
use futures::stream;
use crate::utils::fetch::{FetchError, FetchTranscript, Paper, SearchPapers};
use crate::utils::llm::{ChatMessage, Generate, GenerationError, TextStream};

enum Reply {
    Text(String),
    Fail,
}

/// Endpoint answering from rules: the first rule whose needle occurs in the last message wins.
#[derive(Default)]
pub(crate) struct ScriptedEndpoint {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Text(text.to_string())));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    /// Last message of every call, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|messages| messages.last().map(|m| m.content.clone()))
            .collect()
    }

    /// Full message lists of every call, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl Generate for ScriptedEndpoint {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        match self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((needle, Reply::Fail)) => Err(GenerationError::Unavailable(format!("scripted failure on {:?}", needle))),
            None => Err(GenerationError::Unavailable(format!("no scripted reply for {:?}", prompt))),
        }
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, GenerationError> {
        let reply = self.chat(messages).await?;
        let chunks: Vec<Result<String, GenerationError>> = reply
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Search returning one paper per query, derived from the query text.
#[derive(Default)]
pub(crate) struct EchoSearch {
    pub queries: Mutex<Vec<String>>,
    pub empty_for: Option<String>,
}

#[async_trait]
impl SearchPapers for EchoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Paper>, FetchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.empty_for.as_deref() == Some(query) {
            return Ok(Vec::new());
        }
        let paper = Paper {
            title: Some(format!("{} (paper)", query)),
            abstract_text: Some(format!("abstract of {}", query)),
            url: Some(format!("https://papers.example/{}", query.replace(' ', "-"))),
            citation_count: Some(query.len() as u64),
        };
        Ok(vec![paper; limit.min(1)])
    }
}

/// Transcripts keyed by video id; unknown ids fail.
#[derive(Default)]
pub(crate) struct StaticTranscripts {
    pub transcripts: HashMap<String, String>,
    pub requested: Mutex<Vec<String>>,
}

impl StaticTranscripts {
    pub fn with(video_id: &str, transcript: &str) -> Self {
        Self {
            transcripts: HashMap::from([(video_id.to_string(), transcript.to_string())]),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FetchTranscript for StaticTranscripts {
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(video_id.to_string());
        self.transcripts.get(video_id).cloned().ok_or_else(|| FetchError::NoTranscript {
            video_id: video_id.to_string(),
            reason: "no captions".to_string(),
        })
    }
}
