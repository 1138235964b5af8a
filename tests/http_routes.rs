//! HTTP routes driven through the router without a socket

mod common;

use axum::http::StatusCode;
use common::{body_json, get_request, json_request, Fixture};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use truthlens::http::router;
use truthlens::storage::{Document, DocumentQuery, IndexSpec, StoredDocument};
use truthlens::{
    mock_verification, DocumentStore, MockVerifier, PersistenceGateway, StorageError,
    StorageResult, TruthLensApi, VerifyError,
};

/// A store that answers health checks but rejects writes.
struct RejectingStore;

impl DocumentStore for RejectingStore {
    fn create(&self, _collection: &str, _data: &Document) -> StorageResult<StoredDocument> {
        Err(StorageError::Poisoned)
    }

    fn get(&self, _collection: &str, _id: &str) -> StorageResult<Option<StoredDocument>> {
        Ok(None)
    }

    fn merge(
        &self,
        _collection: &str,
        _id: &str,
        _fields: &Document,
    ) -> StorageResult<StoredDocument> {
        Err(StorageError::Poisoned)
    }

    fn query(
        &self,
        _collection: &str,
        _query: &DocumentQuery,
    ) -> StorageResult<Vec<StoredDocument>> {
        Err(StorageError::Poisoned)
    }

    fn ensure_index(&self, _index: &IndexSpec) -> StorageResult<bool> {
        Ok(false)
    }

    fn probe(&self) -> StorageResult<()> {
        Ok(())
    }
}

fn claim_body() -> serde_json::Value {
    json!({
        "title": "Lightning never strikes twice",
        "statement": "Lightning never strikes the same place twice.",
        "category": "Science",
        "sourceUrl": ""
    })
}

#[tokio::test]
async fn post_then_get_reports() {
    let fx = Fixture::misleading();
    fx.api.ensure_indexes().await.unwrap();
    let app = router(fx.api.clone());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/reports", Some("u1"), claim_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["report"]["truthScore"], 72);
    assert_eq!(created["report"]["claimSourceUrl"], "");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get_request("/reports", Some("u1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["reports"].as_array().unwrap().len(), 1);
    assert_eq!(listed["reports"][0]["id"], id.as_str());

    let response = app
        .oneshot(get_request(&format!("/reports/{}", id), Some("u2")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_listing_is_empty() {
    let fx = Fixture::misleading();
    let response = router(fx.api)
        .oneshot(get_request("/reports", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"success": true, "reports": []}));
}

#[tokio::test]
async fn anonymous_submission_is_unauthorized() {
    let fx = Fixture::misleading();
    let response = router(fx.api.clone())
        .oneshot(json_request("POST", "/reports", None, claim_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["kind"], "unauthenticated");
    assert_eq!(fx.verifier.calls(), 0);
}

#[tokio::test]
async fn invalid_claim_lists_violations() {
    let fx = Fixture::misleading();
    let body = json!({
        "title": "short",
        "statement": "Lightning never strikes the same place twice.",
        "category": "Science",
        "sourceUrl": "not-a-url"
    });
    let response = router(fx.api)
        .oneshot(json_request("POST", "/reports", Some("u1"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "invalid_input");
    let fields: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "sourceUrl"]);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let fx = Fixture::misleading();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/reports")
        .header("content-type", "application/json")
        .header(truthlens::http::PRINCIPAL_HEADER, "u1")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = router(fx.api).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "invalid_input");
}

#[tokio::test]
async fn verifier_failure_is_bad_gateway() {
    let fx = Fixture::with_verifier(MockVerifier::failing(VerifyError::Upstream(
        "model overloaded".into(),
    )));
    let response = router(fx.api.clone())
        .oneshot(json_request("POST", "/reports", Some("u1"), claim_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["kind"], "verification_failed");
    assert_eq!(fx.report_count(), 0);
}

#[tokio::test]
async fn failed_save_is_server_error() {
    let verifier = Arc::new(MockVerifier::returning(mock_verification(
        72,
        "Misleading",
        &["https://s.example"],
    )));
    let gateway = Arc::new(PersistenceGateway::with_store(Arc::new(RejectingStore)));
    let api = TruthLensApi::new(gateway, verifier.clone());

    let response = router(api)
        .oneshot(json_request("POST", "/reports", Some("u1"), claim_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "persistence_failed");
    assert_eq!(verifier.calls(), 1);
}

#[tokio::test]
async fn query_failure_is_server_error() {
    let verifier = Arc::new(MockVerifier::returning(mock_verification(1, "False", &[])));
    let api = TruthLensApi::new(
        Arc::new(PersistenceGateway::with_store(Arc::new(RejectingStore))),
        verifier,
    );

    let response = router(api)
        .oneshot(get_request("/reports", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["kind"], "query_failed");
}

#[tokio::test]
async fn listing_without_index_is_unavailable() {
    let fx = Fixture::misleading();
    let response = router(fx.api)
        .oneshot(get_request("/reports", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["kind"], "index_required");
}

#[tokio::test]
async fn ping_reports_store_health() {
    let fx = Fixture::misleading();
    let response = router(fx.api).oneshot(get_request("/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let verifier = Arc::new(MockVerifier::returning(mock_verification(1, "False", &[])));
    let api = TruthLensApi::new(Arc::new(PersistenceGateway::disabled("offline")), verifier);
    let response = router(api).oneshot(get_request("/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("offline"));
}

#[tokio::test]
async fn profile_upsert_requires_principal() {
    let fx = Fixture::misleading();
    let app = router(fx.api.clone());
    let update = json!({"displayName": "Ada", "photoURL": "https://img.example/ada.png"});

    let response = app
        .clone()
        .oneshot(json_request("POST", "/profile", None, update.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request("POST", "/profile", Some("u1"), update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": true}));

    let stored = truthlens::DocumentStore::get(fx.store.as_ref(), truthlens::profile::USERS, "u1")
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["displayName"], "Ada");
    assert_eq!(stored.data["uid"], "u1");
}
