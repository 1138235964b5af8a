//! Report: the persisted outcome of verifying a claim

use crate::claim::Claim;
use crate::storage::{Document, StorageError, StoredDocument};
use crate::verify::Verification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collection holding reports.
pub const REPORTS: &str = "reports";

/// Owner field used for per-user listing.
pub const OWNER_FIELD: &str = "userId";

/// Unique identifier for a report, assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Truth score in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct TruthScore(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("truth score {0} is outside 0..=100")]
pub struct ScoreOutOfRange(pub i64);

impl TruthScore {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Result<Self, ScoreOutOfRange> {
        Self::try_from(i64::from(value))
    }

    /// Saturate at [`TruthScore::MAX`].
    pub fn clamped(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for TruthScore {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= Self::MAX => Ok(Self(v)),
            _ => Err(ScoreOutOfRange(value)),
        }
    }
}

impl From<TruthScore> for u8 {
    fn from(score: TruthScore) -> Self {
        score.0
    }
}

/// Report fields written by the pipeline. `id` and `createdAt` are absent:
/// the store assigns both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub user_id: String,
    pub claim_title: String,
    pub claim_statement: String,
    pub claim_category: String,
    #[serde(default)]
    pub claim_source_url: String,
    pub truth_score: TruthScore,
    pub verdict: String,
    #[serde(default)]
    pub supporting_sources: Vec<String>,
}

impl NewReport {
    /// Copy the claim verbatim and attach the verification outcome.
    pub fn assemble(user_id: &str, claim: &Claim, verification: &Verification) -> Self {
        Self {
            user_id: user_id.to_string(),
            claim_title: claim.title().to_string(),
            claim_statement: claim.statement().to_string(),
            claim_category: claim.category().as_str().to_string(),
            claim_source_url: claim.source_url().unwrap_or_default().to_string(),
            truth_score: verification.truth_score,
            verdict: verification.verdict.clone(),
            supporting_sources: verification.supporting_sources.clone(),
        }
    }

    pub fn to_document(&self) -> Result<Document, StorageError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(StorageError::InvalidDocument(format!(
                "report serialized to {}",
                other
            ))),
        }
    }

    /// Attach the store-assigned identity and timestamp.
    pub fn into_report(self, id: ReportId, created_at: DateTime<Utc>) -> Report {
        Report {
            id,
            user_id: self.user_id,
            claim_title: self.claim_title,
            claim_statement: self.claim_statement,
            claim_category: self.claim_category,
            claim_source_url: self.claim_source_url,
            truth_score: self.truth_score,
            verdict: self.verdict,
            supporting_sources: self.supporting_sources,
            created_at,
        }
    }
}

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub user_id: String,
    pub claim_title: String,
    pub claim_statement: String,
    pub claim_category: String,
    pub claim_source_url: String,
    pub truth_score: TruthScore,
    pub verdict: String,
    pub supporting_sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Rebuild a report from a stored document. Identity and timestamp come
    /// from the store, never from the document body.
    pub fn from_document(doc: StoredDocument) -> Result<Self, StorageError> {
        let fields: NewReport = serde_json::from_value(serde_json::Value::Object(doc.data))?;
        Ok(fields.into_report(ReportId::from_string(doc.id), doc.created_at))
    }
}
