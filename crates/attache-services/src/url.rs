//! Link interception: fetch, summarize, and archive shared URLs.
//!
//! A message containing a URL skips classification entirely. The page is
//! fetched, reduced to text, summarized and tagged through the gateway,
//! and saved to the archive. An unreachable page or a dead gateway
//! degrades to saving the bare link; the user always gets a reply.

use attache_core::error::AttacheError;
use attache_llm::{ChatTurn, LlmGateway, LlmRequest};
use attache_memory::Store;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const PAGE_CONTENT_LIMIT: usize = 3000;

/// Characters that terminate a URL in running text.
const URL_STOP_CHARS: &str = "<>\"{}|\\^`[]";

const SUMMARIZE_INSTRUCTIONS: &str = "\
You summarize web pages for a personal archive. Respond with JSON only:
{\"summary\": \"2-3 sentence summary\", \"tags\": [\"3-5 short topic tags\"], \
\"key_points\": [\"2-3 key points\"]}
Answer in the language the page is written in.";

/// Every `http://` or `https://` URL in the text, in order.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut rest = text;
    while let Some(i) = rest.find("http") {
        let candidate = &rest[i..];
        if candidate.starts_with("http://") || candidate.starts_with("https://") {
            let end = candidate
                .find(|c: char| c.is_whitespace() || URL_STOP_CHARS.contains(c))
                .unwrap_or(candidate.len());
            urls.push(candidate[..end].to_string());
            rest = &candidate[end..];
        } else {
            rest = &rest[i + 4..];
        }
    }
    urls
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    key_points: Vec<String>,
}

pub struct UrlService {
    gateway: Arc<LlmGateway>,
    store: Store,
    client: reqwest::Client,
}

impl UrlService {
    pub fn new(gateway: Arc<LlmGateway>, store: Store) -> Self {
        Self {
            gateway,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch, summarize, and archive one URL, returning the user reply.
    pub async fn archive_url(&self, user_id: &str, url: &str) -> Result<String, AttacheError> {
        let page = match self.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("[url] fetch failed for {url}: {e}");
                self.store
                    .create_note(
                        user_id,
                        &format!("Saved link: {url}"),
                        &["link".to_string()],
                    )
                    .await?;
                return Ok(format!("I couldn't open that link, saved the URL: {url}"));
            }
        };

        let summary = match self.summarize(url, &page).await {
            Ok(s) => s,
            Err(e) => {
                warn!("[url] summarize failed for {url}: {e}");
                PageSummary {
                    summary: format!("Saved the link: {}", page.title),
                    tags: Vec::new(),
                    key_points: Vec::new(),
                }
            }
        };

        let mut note = format!("{}\n{url}\n\n{}", page.title, summary.summary);
        if !summary.key_points.is_empty() {
            note.push('\n');
            for kp in &summary.key_points {
                note.push_str(&format!("\n- {kp}"));
            }
        }
        self.store.create_note(user_id, &note, &summary.tags).await?;
        info!("[url] archived {url} for {user_id}");

        let mut reply = format!("🔗 Saved: {}\n\n{}", page.title, summary.summary);
        if !summary.key_points.is_empty() {
            reply.push('\n');
            for kp in &summary.key_points {
                reply.push_str(&format!("\n- {kp}"));
            }
        }
        if !summary.tags.is_empty() {
            let tags: Vec<String> = summary.tags.iter().map(|t| format!("#{t}")).collect();
            reply.push_str(&format!("\n\n{}", tags.join(" ")));
        }
        Ok(reply)
    }

    async fn fetch_page(&self, url: &str) -> Result<Page, AttacheError> {
        let body = self
            .client
            .get(url)
            .header("User-Agent", "Mozilla/5.0")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("url fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AttacheError::Service(format!("url fetch failed: {e}")))?
            .text()
            .await
            .map_err(|e| AttacheError::Service(format!("url body read failed: {e}")))?;

        let title = html_title(&body).unwrap_or_else(|| url.to_string());
        let mut content = strip_html(&body);
        let mut end = PAGE_CONTENT_LIMIT.min(content.len());
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        content.truncate(end);
        Ok(Page { title, content })
    }

    async fn summarize(&self, url: &str, page: &Page) -> Result<PageSummary, AttacheError> {
        let request = LlmRequest {
            system: SUMMARIZE_INSTRUCTIONS.to_string(),
            messages: vec![ChatTurn::user(format!(
                "URL: {url}\nTitle: {}\n\nContent:\n{}",
                page.title, page.content
            ))],
            json: true,
        };
        let resp = self.gateway.complete(&request).await?;
        parse_summary(&resp.text)
    }
}

struct Page {
    title: String,
    content: String,
}

fn parse_summary(text: &str) -> Result<PageSummary, AttacheError> {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json").or_else(|| cleaned.strip_prefix("```")) {
        cleaned = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    serde_json::from_str(cleaned)
        .map_err(|e| AttacheError::Service(format!("page summary parse failed: {e}")))
}

/// ASCII case-insensitive search, byte-index based so it stays aligned
/// with the original string on non-ASCII pages.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < from + n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// The contents of the first `<title>` element, if present.
fn html_title(body: &str) -> Option<String> {
    let start = find_ci(body, "<title", 0)?;
    let open_end = start + body[start..].find('>')? + 1;
    let close = find_ci(body, "</title>", open_end)?;
    let title = body[open_end..close].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Reduce an HTML body to readable text: drop script and style blocks,
/// then everything between angle brackets, and collapse whitespace.
fn strip_html(body: &str) -> String {
    let mut out = String::with_capacity(body.len() / 4);
    let mut i = 0;
    while i < body.len() {
        if body.as_bytes()[i] == b'<' {
            let skipped = [("<script", "</script>"), ("<style", "</style>")]
                .into_iter()
                .find(|(open, _)| starts_with_ci(&body[i..], open));
            if let Some((_, close)) = skipped {
                i = find_ci(body, close, i)
                    .map(|j| j + close.len())
                    .unwrap_or(body.len());
            } else {
                i = body[i..].find('>').map(|j| i + j + 1).unwrap_or(body.len());
                out.push(' ');
            }
        } else {
            let next = body[i..].find('<').map(|j| i + j).unwrap_or(body.len());
            out.push_str(&body[i..next]);
            i = next;
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
