//! Transport-independent API layer.
//!
//! `TruthLensApi` is the single entry point for all consumer-facing
//! operations. The HTTP router and the CLI call its methods; they never
//! reach into the pipeline, listing or gateway directly.

use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::claim::RawClaim;
use crate::error::{ListError, ProfileError, SubmissionError};
use crate::gateway::{GatewayError, PersistenceGateway};
use crate::listing::ReportListing;
use crate::pipeline::SubmissionPipeline;
use crate::profile::{ProfileService, ProfileUpdate, UserProfile};
use crate::report::Report;
use crate::verify::ClaimVerifier;

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct TruthLensApi {
    gateway: Arc<PersistenceGateway>,
    pipeline: Arc<SubmissionPipeline>,
    listing: Arc<ReportListing>,
    profiles: Arc<ProfileService>,
}

impl TruthLensApi {
    /// Wire every service to one shared gateway.
    pub fn new(gateway: Arc<PersistenceGateway>, verifier: Arc<dyn ClaimVerifier>) -> Self {
        Self {
            pipeline: Arc::new(SubmissionPipeline::new(gateway.clone(), verifier)),
            listing: Arc::new(ReportListing::new(gateway.clone())),
            profiles: Arc::new(ProfileService::new(gateway.clone())),
            gateway,
        }
    }

    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    // --- Write ---

    pub async fn submit(&self, claim: &RawClaim, user_id: &str) -> Result<Report, SubmissionError> {
        self.pipeline.submit(claim, user_id).await
    }

    pub async fn submit_with_cancel(
        &self,
        claim: &RawClaim,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Report, SubmissionError> {
        self.pipeline.submit_with_cancel(claim, user_id, cancel).await
    }

    pub async fn upsert_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        self.profiles.upsert(uid, update).await
    }

    // --- Read ---

    pub async fn list_reports(&self, user_id: &str) -> Result<Vec<Report>, ListError> {
        self.listing.list_for_user(user_id).await
    }

    pub async fn get_report(&self, user_id: &str, id: &str) -> Result<Report, ListError> {
        self.listing.get_for_user(user_id, id).await
    }

    // --- Operations ---

    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.gateway.ping().await
    }

    /// Provision every composite index the read paths need. Returns `true`
    /// if any index was newly created.
    pub async fn ensure_indexes(&self) -> Result<bool, GatewayError> {
        self.gateway.ensure_index(ReportListing::owner_index()).await
    }
}
