//! Common test utilities for TruthLens integration tests
//!
//! Builds an API over an in-memory store and a mock verifier, and decodes
//! HTTP responses.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use std::sync::Arc;
use truthlens::{
    mock_verification, MockVerifier, OpenStore, PersistenceGateway, RawClaim, SqliteStore,
    TruthLensApi,
};

/// An API wired to an in-memory store, plus handles on both doubles.
pub struct Fixture {
    pub store: Arc<SqliteStore>,
    pub verifier: Arc<MockVerifier>,
    pub api: TruthLensApi,
}

impl Fixture {
    pub fn with_verifier(verifier: MockVerifier) -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().expect("open in-memory store"));
        let verifier = Arc::new(verifier);
        let gateway = Arc::new(PersistenceGateway::with_store(store.clone()));
        let api = TruthLensApi::new(gateway, verifier.clone());
        Self {
            store,
            verifier,
            api,
        }
    }

    /// Verifier answers 72 / Misleading with one source.
    pub fn misleading() -> Self {
        Self::with_verifier(MockVerifier::returning(mock_verification(
            72,
            "Misleading",
            &["https://s.example"],
        )))
    }

    pub fn report_count(&self) -> usize {
        self.store.count(truthlens::report::REPORTS).expect("count reports")
    }
}

pub fn sample_claim() -> RawClaim {
    RawClaim::new(
        "5G towers spread viruses",
        "Radio waves from 5G towers spread viral infections between people.",
        "Technology",
    )
    .with_source_url("https://example.com/a")
}

pub fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(truthlens::http::PRINCIPAL_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).expect("build request")
}

pub fn get_request(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(truthlens::http::PRINCIPAL_HEADER, user);
    }
    builder.body(Body::empty()).expect("build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
