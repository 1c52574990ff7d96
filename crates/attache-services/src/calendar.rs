//! Calendar collaborator client and domain service.
//!
//! The calendar itself lives behind a small HTTP collaborator; this
//! module only speaks its JSON API. When no collaborator URL is
//! configured, event creation reports the calendar as not connected.

use async_trait::async_trait;
use attache_core::{
    error::AttacheError,
    intent::{CalendarPayload, IntentDecision, IntentPayload},
    traits::DomainService,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// HTTP client for the calendar collaborator.
#[derive(Clone)]
pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateEventRequest<'a> {
    summary: &'a str,
    start_time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<EventItem>,
}

#[derive(Deserialize)]
struct EventItem {
    summary: String,
    start_time: String,
    #[serde(default)]
    location: Option<String>,
}

impl CalendarClient {
    /// `base_url` may be empty, meaning the calendar is not connected.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// Create an event. Returns the collaborator's confirmation text.
    pub async fn create_event(&self, payload: &CalendarPayload) -> Result<(), AttacheError> {
        let body = CreateEventRequest {
            summary: &payload.summary,
            start_time: &payload.start_time,
            end_time: payload.end_time.as_deref(),
            location: payload.location.as_deref(),
            description: payload.description.as_deref(),
        };

        let url = format!("{}/events", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("calendar create failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AttacheError::Service(format!(
                "calendar collaborator returned {status}"
            )));
        }
        Ok(())
    }

    /// Events for a date ("YYYY-MM-DD"), or today when `None`.
    pub async fn events_for_date(&self, date: Option<&str>) -> Result<Vec<String>, AttacheError> {
        let mut url = format!("{}/events", self.base_url.trim_end_matches('/'));
        if let Some(d) = date {
            url.push_str(&format!("?date={d}"));
        }

        let resp: EventsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("calendar fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Service(format!("calendar parse failed: {e}")))?;

        Ok(resp
            .events
            .into_iter()
            .map(|e| {
                let loc = e
                    .location
                    .map(|l| format!(" @ {l}"))
                    .unwrap_or_default();
                format!("- {} — {}{loc}", e.start_time, e.summary)
            })
            .collect())
    }
}

/// Creates calendar events from classified intents.
pub struct CalendarService {
    client: CalendarClient,
}

impl CalendarService {
    pub fn new(client: CalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DomainService for CalendarService {
    fn name(&self) -> &str {
        "calendar"
    }

    async fn execute(
        &self,
        _user_id: &str,
        decision: &IntentDecision,
    ) -> Result<String, AttacheError> {
        let payload = match &decision.payload {
            IntentPayload::Calendar(p) => p,
            other => {
                return Err(AttacheError::Service(format!(
                    "calendar service got non-calendar payload: {other:?}"
                )))
            }
        };

        if !self.client.is_connected() {
            return Ok("Calendar isn't connected yet, so I can't create events.".to_string());
        }

        self.client.create_event(payload).await?;
        info!("[calendar] created event '{}'", payload.summary);

        Ok(format!(
            "📅 Scheduled: {} at {}",
            payload.summary, payload.start_time
        ))
    }
}
