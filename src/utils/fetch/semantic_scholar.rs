use std::env;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use url::Url;
use crate::utils::fetch::{get_text, FetchError, Paper, SearchPapers};

pub const DEFAULT_API_BASE: &str = "https://api.semanticscholar.org/graph/v1/";
pub const API_KEY_VAR: &str = "SEMANTIC_SCHOLAR_API_KEY";
const FIELDS: &str = "title,url,abstract,citationCount";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

/// Client of the Semantic Scholar Graph API paper search.
#[derive(Debug, Clone)]
pub struct SemanticScholar {
    client: reqwest::Client,
    api_base: Url,
    api_key: Option<String>,
}

impl SemanticScholar {
    /// Public API, with the optional key from `SEMANTIC_SCHOLAR_API_KEY`.
    pub fn new() -> Self {
        Self::with_api_base(Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url"))
    }

    pub fn with_api_base(api_base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key: env::var(API_KEY_VAR).ok(),
        }
    }

    fn search_url(&self) -> Result<Url, FetchError> {
        Ok(self.api_base.join("paper/search")?)
    }
}

impl Default for SemanticScholar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchPapers for SemanticScholar {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Paper>, FetchError> {
        let url = self.search_url()?;
        let params = [
            ("query", query.to_string()),
            ("fields", FIELDS.to_string()),
            ("limit", limit.to_string()),
            ("offset", "0".to_string()),
        ];
        let mut request = self.client.get(url.clone()).query(&params);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }
        debug!("searching papers for {:?}", query);
        let body = get_text(request, url.as_str()).await?;
        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed { url: url.to_string(), reason: e.to_string() })?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod test_semantic_scholar {
    use url::Url;
    use super::{SearchResponse, SemanticScholar};

    #[test]
    fn test_search_url_keeps_version_path() {
        let client = SemanticScholar::new();
        assert_eq!("https://api.semanticscholar.org/graph/v1/paper/search", client.search_url().unwrap().as_str());

        let client = SemanticScholar::with_api_base(Url::parse("http://localhost:8080/graph/v1/").unwrap());
        assert_eq!("http://localhost:8080/graph/v1/paper/search", client.search_url().unwrap().as_str());
    }

    #[test]
    fn test_response_without_data() {
        let response: SearchResponse = serde_json::from_str(r#"{"total": 0, "offset": 0}"#).unwrap();
        assert!(response.data.is_empty());
    }
}
