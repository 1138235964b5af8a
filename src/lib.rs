//! TruthLens: claim fact-checking service
//!
//! An authenticated user submits a factual claim and receives a persisted
//! fact-check report: a truth score, a verdict and supporting sources.
//!
//! # Core Concepts
//!
//! - **Claim**: user input, validated before anything else happens
//! - **Verifier**: the external capability that scores a claim
//! - **Gateway**: the single, lazily opened connection to the document store
//! - **Report**: the verified outcome, written once and never edited
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use truthlens::{mock_verification, MockVerifier, OpenStore, PersistenceGateway, RawClaim, SqliteStore, TruthLensApi};
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! let verifier = Arc::new(MockVerifier::returning(mock_verification(72, "Misleading", &[])));
//! let api = TruthLensApi::new(Arc::new(PersistenceGateway::with_store(store)), verifier);
//!
//! let claim = RawClaim::new(
//!     "Coffee cures colds",
//!     "Drinking coffee every day cures the common cold.",
//!     "Health",
//! );
//! let report = api.submit(&claim, "user-1").await.unwrap();
//! assert_eq!(report.verdict, "Misleading");
//! # });
//! ```

pub mod api;
pub mod cancel;
pub mod claim;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod listing;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod storage;
pub mod verify;

pub use api::TruthLensApi;
pub use cancel::CancellationToken;
pub use claim::{validate, Category, Claim, ClaimField, FieldViolation, RawClaim, ValidationError};
pub use config::AppConfig;
pub use error::{ErrorKind, ListError, ProfileError, SubmissionError};
pub use gateway::{
    BackendUnavailable, CredentialSource, EnvSource, GatewayError, PersistenceGateway, ProcessEnv,
    SqliteConnector, StoreConnector,
};
pub use listing::ReportListing;
pub use pipeline::SubmissionPipeline;
pub use profile::{ProfileService, ProfileUpdate, UserProfile};
pub use report::{NewReport, Report, ReportId, TruthScore};
pub use storage::{DocumentStore, OpenStore, SqliteStore, StorageError, StorageResult};
pub use verify::{
    mock_verification, ClaimVerifier, HttpVerifier, MockVerifier, TimeoutVerifier, Verification,
    VerifyError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
