//! The tiered gateway: ordered fallback across backends.

use crate::backend::{BackendError, LlmBackend, LlmRequest, LlmResponse};
use attache_core::error::AttacheError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One entry in the gateway's ordered fallback list.
pub struct Tier {
    pub backend: Arc<dyn LlmBackend>,
    pub model: String,
    /// Extra attempts after the first, on transient failure only.
    pub retries: u32,
    /// Per-attempt deadline.
    pub timeout: Duration,
}

impl Tier {
    /// Tier label used in logs and response metadata.
    pub fn label(&self) -> String {
        format!("{}/{}", self.backend.name(), self.model)
    }
}

/// The language-model gateway.
///
/// Tries tiers strictly in order. Within a tier, a transient failure is
/// retried up to `retries` times; a fatal or schema failure moves straight
/// to the next tier. Only when every tier is spent does the caller see an
/// error, and it is always the same one.
pub struct LlmGateway {
    tiers: Vec<Tier>,
}

impl LlmGateway {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Run a completion through the tier list.
    pub async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AttacheError> {
        if self.tiers.is_empty() {
            return Err(AttacheError::Llm("no tiers configured".to_string()));
        }

        for tier in &self.tiers {
            let label = tier.label();
            let attempts = tier.retries + 1;

            for attempt in 1..=attempts {
                debug!("[llm] {label} attempt {attempt}/{attempts}");

                let result = tokio::time::timeout(
                    tier.timeout,
                    tier.backend.complete(&tier.model, request),
                )
                .await;

                let err = match result {
                    Ok(Ok(mut resp)) => {
                        resp.tier = label;
                        return Ok(resp);
                    }
                    Ok(Err(e)) => e,
                    Err(_) => BackendError::Transient(format!(
                        "{label} timed out after {:?}",
                        tier.timeout
                    )),
                };

                if err.is_transient() && attempt < attempts {
                    warn!("[llm] {label} transient failure, retrying: {err}");
                    continue;
                }
                warn!("[llm] {label} failed, moving to next tier: {err}");
                break;
            }
        }

        Err(AttacheError::Llm("all tiers exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatTurn;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A scripted backend: pops one outcome per call.
    struct FakeBackend {
        name: &'static str,
        outcomes: std::sync::Mutex<Vec<Result<String, BackendError>>>,
        calls: AtomicU32,
    }

    impl FakeBackend {
        fn new(name: &'static str, outcomes: Vec<Result<String, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcomes: std::sync::Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmBackend for FakeBackend {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(
            &self,
            model: &str,
            _request: &LlmRequest,
        ) -> Result<LlmResponse, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Err(BackendError::Fatal("script exhausted".into()));
            }
            outcomes.remove(0).map(|text| LlmResponse {
                text,
                model: model.to_string(),
                tier: String::new(),
                tokens_used: Some(10),
                elapsed_ms: 1,
            })
        }
    }

    fn tier(backend: Arc<FakeBackend>, model: &str, retries: u32) -> Tier {
        Tier {
            backend,
            model: model.to_string(),
            retries,
            timeout: Duration::from_secs(5),
        }
    }

    fn request() -> LlmRequest {
        LlmRequest {
            system: "be brief".into(),
            messages: vec![ChatTurn::user("hello")],
            json: false,
        }
    }

    #[tokio::test]
    async fn test_first_tier_success_stops_there() {
        let a = FakeBackend::new("a", vec![Ok("from a".into())]);
        let b = FakeBackend::new("b", vec![Ok("from b".into())]);
        let gw = LlmGateway::new(vec![tier(a.clone(), "m1", 1), tier(b.clone(), "m2", 1)]);

        let resp = gw.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "from a");
        assert_eq!(resp.tier, "a/m1");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once_then_falls_through() {
        let a = FakeBackend::new(
            "a",
            vec![
                Err(BackendError::Transient("429".into())),
                Err(BackendError::Transient("429 again".into())),
            ],
        );
        let b = FakeBackend::new("b", vec![Ok("from b".into())]);
        let gw = LlmGateway::new(vec![tier(a.clone(), "m1", 1), tier(b.clone(), "m2", 1)]);

        let resp = gw.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "from b");
        // First tier: initial attempt + 1 retry, both transient.
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_fatal_failure_skips_tier_without_retry() {
        let a = FakeBackend::new("a", vec![Err(BackendError::Fatal("401".into()))]);
        let b = FakeBackend::new("b", vec![Ok("from b".into())]);
        let gw = LlmGateway::new(vec![tier(a.clone(), "m1", 3), tier(b.clone(), "m2", 1)]);

        let resp = gw.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "from b");
        assert_eq!(a.calls(), 1, "fatal errors must not be retried");
    }

    #[tokio::test]
    async fn test_schema_failure_skips_tier_without_retry() {
        let a = FakeBackend::new("a", vec![Err(BackendError::Schema("bad json".into()))]);
        let b = FakeBackend::new("b", vec![Ok("from b".into())]);
        let gw = LlmGateway::new(vec![tier(a.clone(), "m1", 3), tier(b.clone(), "m2", 1)]);

        let resp = gw.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "from b");
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_tiers_exhausted() {
        let a = FakeBackend::new("a", vec![Err(BackendError::Transient("down".into()))]);
        let b = FakeBackend::new("b", vec![Err(BackendError::Fatal("401".into()))]);
        let gw = LlmGateway::new(vec![tier(a.clone(), "m1", 0), tier(b.clone(), "m2", 0)]);

        let err = gw.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AttacheError::Llm(ref m) if m.contains("all tiers exhausted")));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_gateway_errors() {
        let gw = LlmGateway::new(vec![]);
        assert!(gw.complete(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_transient() {
        struct SlowBackend;
        #[async_trait]
        impl LlmBackend for SlowBackend {
            fn name(&self) -> &str {
                "slow"
            }
            async fn complete(
                &self,
                _model: &str,
                _request: &LlmRequest,
            ) -> Result<LlmResponse, BackendError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                unreachable!()
            }
        }

        let b = FakeBackend::new("b", vec![Ok("rescued".into())]);
        let gw = LlmGateway::new(vec![
            Tier {
                backend: Arc::new(SlowBackend),
                model: "m1".into(),
                retries: 0,
                timeout: Duration::from_millis(10),
            },
            tier(b.clone(), "m2", 0),
        ]);

        let resp = gw.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "rescued");
    }
}
