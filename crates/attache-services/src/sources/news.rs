//! AI/tech news via the Hacker News Algolia search API.

use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::ContextSource};
use serde::Deserialize;

const HN_SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
const MAX_ITEMS: usize = 5;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    points: i64,
}

pub struct NewsSource {
    client: reqwest::Client,
}

impl NewsSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for NewsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextSource for NewsSource {
    fn name(&self) -> &str {
        "news"
    }

    async fn fetch(&self, _query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        let url = format!("{HN_SEARCH_URL}?query=AI&tags=story&hitsPerPage={MAX_ITEMS}");
        let resp: SearchResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("news fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Service(format!("news parse failed: {e}")))?;

        let lines: Vec<String> = resp
            .hits
            .iter()
            .filter_map(|h| {
                let title = h.title.as_deref()?;
                let link = h
                    .url
                    .as_deref()
                    .map(|u| format!(" — {u}"))
                    .unwrap_or_default();
                Some(format!("- {title} ({} points){link}", h.points))
            })
            .take(MAX_ITEMS)
            .collect();

        if lines.is_empty() {
            Ok("🤖 No recent AI news found.".to_string())
        } else {
            Ok(format!("🤖 AI News (live):\n{}", lines.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{"hits":[
            {"title":"New model released","url":"https://example.com","points":320},
            {"title":"Untitled","points":5}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.hits.len(), 2);
        assert_eq!(resp.hits[0].points, 320);
        assert!(resp.hits[1].url.is_none());
    }

    #[test]
    fn test_empty_hits_tolerated() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.hits.is_empty());
    }
}
