//! Submission pipeline: validate, verify, persist
//!
//! Steps run strictly in sequence. The verifier is called at most once per
//! submission and a report is written only after it succeeds.

use crate::cancel::CancellationToken;
use crate::claim::{self, RawClaim};
use crate::error::SubmissionError;
use crate::gateway::PersistenceGateway;
use crate::report::{NewReport, Report, ReportId, REPORTS};
use crate::verify::ClaimVerifier;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct SubmissionPipeline {
    gateway: Arc<PersistenceGateway>,
    verifier: Arc<dyn ClaimVerifier>,
}

impl SubmissionPipeline {
    pub fn new(gateway: Arc<PersistenceGateway>, verifier: Arc<dyn ClaimVerifier>) -> Self {
        Self { gateway, verifier }
    }

    /// Submit a claim on behalf of `user_id`.
    pub async fn submit(&self, raw: &RawClaim, user_id: &str) -> Result<Report, SubmissionError> {
        self.submit_with_cancel(raw, user_id, &CancellationToken::new())
            .await
    }

    /// Submit a claim, honoring `cancel` up to the moment the report is
    /// written.
    pub async fn submit_with_cancel(
        &self,
        raw: &RawClaim,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Report, SubmissionError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SubmissionError::Unauthenticated);
        }

        let claim = claim::validate(raw)?;
        debug!(user = user_id, category = %claim.category(), "claim validated");

        // Fail before spending a verification call on a disabled backend.
        let store = self.gateway.store().await?;

        if cancel.is_cancelled() {
            return Err(SubmissionError::Cancelled);
        }

        let verification = tokio::select! {
            result = self.verifier.verify(&claim) => result?,
            _ = cancel.cancelled() => {
                debug!(user = user_id, "submission cancelled during verification");
                return Err(SubmissionError::Cancelled);
            }
        };
        debug!(
            user = user_id,
            score = verification.truth_score.value(),
            verdict = %verification.verdict,
            "claim verified"
        );

        if cancel.is_cancelled() {
            debug!(user = user_id, "submission cancelled after verification");
            return Err(SubmissionError::Cancelled);
        }

        let new_report = NewReport::assemble(user_id, &claim, &verification);
        let saved = match new_report.to_document() {
            Ok(doc) => store.create(REPORTS, doc).await,
            Err(e) => Err(e),
        };
        let stored = match saved {
            Ok(stored) => stored,
            Err(source) => {
                error!(user = user_id, error = %source, "verified report could not be saved");
                return Err(SubmissionError::PersistenceFailed {
                    verification,
                    source,
                });
            }
        };

        info!(user = user_id, report = %stored.id, "report saved");
        Ok(new_report.into_report(ReportId::from_string(stored.id), stored.created_at))
    }
}
