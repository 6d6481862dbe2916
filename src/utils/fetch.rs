//! External data the pipelines read besides the LLM: paper search results and video transcripts.

pub mod semantic_scholar;
pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use semantic_scholar::SemanticScholar;
pub use youtube::YouTubeTranscripts;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {url}: {reason}")]
    Malformed {
        url: String,
        reason: String,
    },
    #[error("could not retrieve transcript for video {video_id}: {reason}")]
    NoTranscript {
        video_id: String,
        reason: String,
    },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// One search hit. Every field may be missing in the API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "citationCount")]
    pub citation_count: Option<u64>,
}

/// Paper search service.
#[async_trait]
pub trait SearchPapers: Send + Sync {
    /// Returns at most `limit` papers for the query. An empty result is not an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Paper>, FetchError>;
}

/// Transcript retrieval service.
#[async_trait]
pub trait FetchTranscript: Send + Sync {
    /// Returns the full transcript text of a video.
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, FetchError>;
}

/// Sends a GET request and returns the body of a successful response.
pub(crate) async fn get_text(request: reqwest::RequestBuilder, url: &str) -> Result<String, FetchError> {
    let response = request.send().await.map_err(|source| FetchError::Request { url: url.to_string(), source })?;
    let status = response.status();
    let body = response.text().await.map_err(|source| FetchError::Request { url: url.to_string(), source })?;
    if !status.is_success() {
        return Err(FetchError::Status { url: url.to_string(), status: status.as_u16(), body });
    }
    Ok(body)
}

#[cfg(test)]
mod test_fetch {
    use super::Paper;

    #[test]
    fn test_paper_from_api_json() {
        let json = r#"{"paperId": "x", "title": "Attention Is All You Need", "abstract": null,
                       "url": "https://www.semanticscholar.org/paper/x", "citationCount": 120000}"#;
        let paper: Paper = serde_json::from_str(json).unwrap();
        assert_eq!(Some("Attention Is All You Need".to_string()), paper.title);
        assert_eq!(None, paper.abstract_text);
        assert_eq!(Some(120000), paper.citation_count);
    }
}
