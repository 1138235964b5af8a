//! Claim verification: the external capability that scores a claim
//!
//! Defines the verifier trait and its result types. Implementations:
//! - `HttpVerifier`: POSTs the claim to a verification service (production)
//! - `TimeoutVerifier`: bounds any verifier with a caller-chosen deadline
//! - `UnconfiguredVerifier`: always unavailable (no endpoint configured)
//! - `MockVerifier`: returns a preconfigured outcome (testing)
//!
//! The pipeline treats the verifier as opaque. It calls it once per
//! submission and never retries.

use crate::claim::Claim;
use crate::report::TruthScore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Outcome of verifying a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub truth_score: TruthScore,
    pub verdict: String,
    #[serde(default)]
    pub supporting_sources: Vec<String>,
}

/// Errors from verifier operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    #[error("verifier not available: {0}")]
    Unavailable(String),
    #[error("verification failed: {0}")]
    Upstream(String),
    #[error("invalid verifier response: {0}")]
    InvalidResponse(String),
    #[error("verification timed out after {0:?}")]
    TimedOut(Duration),
}

/// Verifier trait.
///
/// Abstracts over transport (HTTP, in-process model, mock) so the pipeline
/// doesn't depend on how verification is reached.
#[async_trait]
pub trait ClaimVerifier: Send + Sync {
    async fn verify(&self, claim: &Claim) -> Result<Verification, VerifyError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    title: &'a str,
    statement: &'a str,
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    truth_score: i64,
    verdict: String,
    #[serde(default)]
    supporting_sources: Vec<String>,
}

/// Client for an HTTP verification service.
///
/// The request body is `{title, statement, category, sourceUrl?}`; the
/// service answers `{truthScore, verdict, supportingSources}`. No timeout is
/// set here; wrap in [`TimeoutVerifier`] to bound the call.
pub struct HttpVerifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpVerifier {
    pub fn new(endpoint: Url, api_key: Option<String>) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| VerifyError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ClaimVerifier for HttpVerifier {
    async fn verify(&self, claim: &Claim) -> Result<Verification, VerifyError> {
        let body = VerifyRequest {
            title: claim.title(),
            statement: claim.statement(),
            category: claim.category().as_str(),
            source_url: claim.source_url(),
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                VerifyError::Unavailable(e.to_string())
            } else {
                VerifyError::Upstream(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VerifyError::Upstream(format!(
                "verifier returned {}: {}",
                status,
                detail.trim()
            )));
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::InvalidResponse(e.to_string()))?;
        let truth_score = TruthScore::try_from(parsed.truth_score)
            .map_err(|e| VerifyError::InvalidResponse(e.to_string()))?;

        Ok(Verification {
            truth_score,
            verdict: parsed.verdict,
            supporting_sources: parsed.supporting_sources,
        })
    }
}

/// Bounds an inner verifier with a deadline.
pub struct TimeoutVerifier<V> {
    inner: V,
    limit: Duration,
}

impl<V: ClaimVerifier> TimeoutVerifier<V> {
    pub fn new(inner: V, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<V: ClaimVerifier> ClaimVerifier for TimeoutVerifier<V> {
    async fn verify(&self, claim: &Claim) -> Result<Verification, VerifyError> {
        tokio::time::timeout(self.limit, self.inner.verify(claim))
            .await
            .map_err(|_| VerifyError::TimedOut(self.limit))?
    }
}

/// Stands in when no verification endpoint is configured. Every call fails
/// with [`VerifyError::Unavailable`]; listing and profiles keep working.
pub struct UnconfiguredVerifier;

#[async_trait]
impl ClaimVerifier for UnconfiguredVerifier {
    async fn verify(&self, _claim: &Claim) -> Result<Verification, VerifyError> {
        Err(VerifyError::Unavailable(
            "no verification endpoint configured".to_string(),
        ))
    }
}

/// Mock verifier for testing. Returns a preconfigured outcome.
pub struct MockVerifier {
    outcome: Result<Verification, VerifyError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockVerifier {
    /// A verifier that always succeeds with `verification`.
    pub fn returning(verification: Verification) -> Self {
        Self {
            outcome: Ok(verification),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A verifier that always fails with `error`.
    pub fn failing(error: VerifyError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `verify` has been entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimVerifier for MockVerifier {
    async fn verify(&self, _claim: &Claim) -> Result<Verification, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Helper to construct a Verification for testing.
///
/// Scores above 100 are clamped.
pub fn mock_verification(score: u8, verdict: &str, sources: &[&str]) -> Verification {
    Verification {
        truth_score: TruthScore::clamped(score),
        verdict: verdict.to_string(),
        supporting_sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{validate, RawClaim};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn claim() -> Claim {
        validate(
            &RawClaim::new(
                "Moon landing was staged",
                "The 1969 moon landing was filmed in a studio.",
                "Science",
            )
            .with_source_url("https://example.com/a"),
        )
        .unwrap()
    }

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/verify", addr)).unwrap()
    }

    #[tokio::test]
    async fn mock_returns_configured_verification() {
        let verifier = MockVerifier::returning(mock_verification(72, "Misleading", &["https://s.example"]));
        let result = verifier.verify(&claim()).await.unwrap();
        assert_eq!(result.truth_score.value(), 72);
        assert_eq!(result.verdict, "Misleading");
        assert_eq!(verifier.calls(), 1);
    }

    #[tokio::test]
    async fn mock_failure_is_returned() {
        let verifier = MockVerifier::failing(VerifyError::Upstream("model overloaded".into()));
        let err = verifier.verify(&claim()).await.unwrap_err();
        assert!(matches!(err, VerifyError::Upstream(ref m) if m == "model overloaded"));
    }

    #[tokio::test]
    async fn timeout_wrapper_bounds_slow_verifier() {
        let slow = MockVerifier::returning(mock_verification(50, "Unverified", &[]))
            .with_delay(Duration::from_millis(500));
        let verifier = TimeoutVerifier::new(slow, Duration::from_millis(20));
        let err = verifier.verify(&claim()).await.unwrap_err();
        assert!(matches!(err, VerifyError::TimedOut(_)));
    }

    #[tokio::test]
    async fn http_verifier_posts_claim_and_parses_result() {
        let router = Router::new().route(
            "/verify",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["category"], "Science");
                assert_eq!(body["sourceUrl"], "https://example.com/a");
                Json(json!({
                    "truthScore": 3,
                    "verdict": "False",
                    "supportingSources": ["https://nasa.example/apollo"]
                }))
            }),
        );
        let endpoint = serve(router).await;

        let verifier = HttpVerifier::new(endpoint, Some("key".into())).unwrap();
        let result = verifier.verify(&claim()).await.unwrap();
        assert_eq!(result.truth_score.value(), 3);
        assert_eq!(result.verdict, "False");
        assert_eq!(result.supporting_sources, vec!["https://nasa.example/apollo"]);
    }

    #[tokio::test]
    async fn http_verifier_rejects_out_of_range_score() {
        let router = Router::new().route(
            "/verify",
            post(|| async { Json(json!({"truthScore": 130, "verdict": "True"})) }),
        );
        let verifier = HttpVerifier::new(serve(router).await, None).unwrap();
        let err = verifier.verify(&claim()).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn http_verifier_surfaces_upstream_status() {
        let router = Router::new().route(
            "/verify",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "quota exhausted") }),
        );
        let verifier = HttpVerifier::new(serve(router).await, None).unwrap();
        let err = verifier.verify(&claim()).await.unwrap_err();
        match err {
            VerifyError::Upstream(msg) => assert!(msg.contains("quota exhausted")),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }
}
