//! Web search via the Brave Search API.

use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::ContextSource};
use serde::Deserialize;

const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const MAX_RESULTS: usize = 5;

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
}

pub struct SearchSource {
    client: reqwest::Client,
    api_key: String,
}

impl SearchSource {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ContextSource for SearchSource {
    fn name(&self) -> &str {
        "web"
    }

    async fn fetch(&self, query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        if self.api_key.is_empty() {
            return Err(AttacheError::Service("web search: no API key".to_string()));
        }

        let resp: BraveResponse = self
            .client
            .get(BRAVE_URL)
            .query(&[("q", query), ("count", &MAX_RESULTS.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("web search failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Service(format!("web search parse failed: {e}")))?;

        let results = resp.web.map(|w| w.results).unwrap_or_default();
        if results.is_empty() {
            return Ok("🌐 No search results.".to_string());
        }

        let lines: Vec<String> = results
            .iter()
            .take(MAX_RESULTS)
            .map(|r| format!("- {}\n  {}\n  {}", r.title, r.description, r.url))
            .collect();

        Ok(format!("🌐 Search results:\n{}", lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brave_response_parsing() {
        let json = r#"{"web":{"results":[
            {"title":"Rust releases 1.85","description":"The Rust team...","url":"https://blog.rust-lang.org"}
        ]}}"#;
        let resp: BraveResponse = serde_json::from_str(json).unwrap();
        let results = resp.web.unwrap().results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rust releases 1.85");
    }

    #[test]
    fn test_missing_web_section_tolerated() {
        let resp: BraveResponse = serde_json::from_str(r#"{"query":{}}"#).unwrap();
        assert!(resp.web.is_none());
    }
}
