//! End-to-end submission and listing through the public API

mod common;

use common::{sample_claim, Fixture};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use truthlens::gateway::credentials::{CLIENT_EMAIL_VAR, PRIVATE_KEY_VAR, PROJECT_ID_VAR};
use truthlens::{
    mock_verification, AppConfig, CancellationToken, ErrorKind, MockVerifier, PersistenceGateway,
    RawClaim, SqliteConnector, SubmissionError, TruthLensApi, VerifyError,
};

#[tokio::test]
async fn submit_then_list_round_trip() {
    let fx = Fixture::misleading();
    fx.api.ensure_indexes().await.unwrap();

    let report = fx.api.submit(&sample_claim(), "u1").await.unwrap();
    assert_eq!(report.truth_score.value(), 72);
    assert_eq!(report.verdict, "Misleading");
    assert_eq!(report.supporting_sources, vec!["https://s.example"]);
    assert_eq!(report.claim_category, "Technology");
    assert_eq!(report.claim_source_url, "https://example.com/a");

    let listed = fx.api.list_reports("u1").await.unwrap();
    assert_eq!(listed, vec![report]);
    assert_eq!(fx.verifier.calls(), 1);
}

#[tokio::test]
async fn listing_is_per_user_and_newest_first() {
    let fx = Fixture::misleading();
    fx.api.ensure_indexes().await.unwrap();

    let mut u1_ids = Vec::new();
    for (user, title) in [
        ("u1", "Claim number one"),
        ("u2", "Someone else's claim"),
        ("u1", "Claim number two"),
        ("u1", "Claim number three"),
    ] {
        let claim = RawClaim::new(title, "A statement that is long enough to pass.", "Other");
        let report = fx.api.submit(&claim, user).await.unwrap();
        if user == "u1" {
            u1_ids.push(report.id);
        }
    }

    let listed = fx.api.list_reports("u1").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|r| r.id.clone()).collect();
    u1_ids.reverse();
    assert_eq!(ids, u1_ids);
    assert!(listed.iter().all(|r| r.user_id == "u1"));
}

#[tokio::test]
async fn listing_without_index_is_actionable() {
    let fx = Fixture::misleading();
    fx.api.submit(&sample_claim(), "u1").await.unwrap();

    let err = fx.api.list_reports("u1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexRequired);
    assert!(err.to_string().contains("userId ASC, createdAt DESC"));
}

#[tokio::test]
async fn failed_verification_leaves_store_empty() {
    let fx = Fixture::with_verifier(MockVerifier::failing(VerifyError::TimedOut(
        Duration::from_secs(30),
    )));

    let err = fx.api.submit(&sample_claim(), "u1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationFailed);
    assert_eq!(fx.report_count(), 0);
}

#[tokio::test]
async fn cancelled_submission_writes_nothing() {
    let fx = Fixture::with_verifier(
        MockVerifier::returning(mock_verification(10, "False", &[]))
            .with_delay(Duration::from_millis(100)),
    );
    let token = CancellationToken::new();

    let api = fx.api.clone();
    let task_token = token.clone();
    let task = tokio::spawn(async move {
        api.submit_with_cancel(&sample_claim(), "u1", &task_token).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    assert!(matches!(task.await.unwrap(), Err(SubmissionError::Cancelled)));
    assert_eq!(fx.report_count(), 0);
}

#[tokio::test]
async fn backend_without_credentials_fails_fast() {
    let verifier = Arc::new(MockVerifier::returning(mock_verification(50, "Unverified", &[])));
    let gateway = Arc::new(PersistenceGateway::new(
        HashMap::<String, String>::new(),
        SqliteConnector::in_memory(),
    ));
    let api = TruthLensApi::new(gateway, verifier.clone());

    let err = api.submit(&sample_claim(), "u1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(verifier.calls(), 0);
    assert!(api.ping().await.is_err());
    assert_eq!(
        api.list_reports("u1").await.unwrap_err().kind(),
        ErrorKind::BackendUnavailable
    );
}

#[tokio::test]
async fn on_disk_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let env: HashMap<String, String> = [
        (CLIENT_EMAIL_VAR, "svc@example.com"),
        (PRIVATE_KEY_VAR, "key"),
        (PROJECT_ID_VAR, "restart-test"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let report = {
        let gateway = Arc::new(
            AppConfig {
                data_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            }
            .build_gateway(env.clone()),
        );
        let verifier = Arc::new(MockVerifier::returning(mock_verification(88, "Mostly True", &[])));
        let api = TruthLensApi::new(gateway, verifier);
        api.ensure_indexes().await.unwrap();
        api.submit(&sample_claim(), "u1").await.unwrap()
    };

    let gateway = Arc::new(PersistenceGateway::new(env, SqliteConnector::new(dir.path())));
    let verifier = Arc::new(MockVerifier::returning(mock_verification(0, "False", &[])));
    let api = TruthLensApi::new(gateway, verifier);

    // Index declarations persist with the store.
    assert!(!api.ensure_indexes().await.unwrap());
    assert_eq!(api.list_reports("u1").await.unwrap(), vec![report]);
}
