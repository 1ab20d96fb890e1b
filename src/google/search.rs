//! Google Custom Search API surface
//!
//! Keyed web search; authenticates with an API key and search-engine id
//! rather than the OAuth credential.

use serde::Deserialize;

use crate::config::endpoints::CUSTOM_SEARCH_API;
use crate::error::Result;
use crate::google::services::read_json;

/// Custom Search response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,

    #[serde(default)]
    pub search_information: Option<SearchInformation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInformation {
    #[serde(default)]
    pub total_results: Option<String>,
}

/// Web-search client bound to an API key and engine id
pub struct SearchService<'a> {
    client: &'a reqwest::Client,
    api_key: &'a str,
    cse_id: &'a str,
}

impl<'a> SearchService<'a> {
    pub fn new(client: &'a reqwest::Client, api_key: &'a str, cse_id: &'a str) -> Self {
        Self {
            client,
            api_key,
            cse_id,
        }
    }

    /// Run a web search
    pub async fn query(&self, query: &str, num_results: i64) -> Result<SearchResponse> {
        let num_results = num_results.to_string();
        let response = self
            .client
            .get(CUSTOM_SEARCH_API)
            .query(&[
                ("key", self.api_key),
                ("cx", self.cse_id),
                ("q", query),
                ("num", num_results.as_str()),
            ])
            .send()
            .await?;

        read_json(response, "search results").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialize() {
        let json = r#"{
            "items": [
                {"title": "Rust", "link": "https://rust-lang.org", "snippet": "A language"}
            ],
            "searchInformation": {"totalResults": "1200"}
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].title.as_deref(), Some("Rust"));
        assert_eq!(
            response
                .search_information
                .unwrap()
                .total_results
                .as_deref(),
            Some("1200")
        );
    }

    #[test]
    fn test_empty_response_deserialize() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.items.is_empty());
        assert!(response.search_information.is_none());
    }
}
