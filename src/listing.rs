//! Per-user report listing

use crate::error::ListError;
use crate::gateway::PersistenceGateway;
use crate::report::{Report, OWNER_FIELD, REPORTS};
use crate::storage::{Direction, DocumentQuery, IndexSpec, CREATED_AT};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads the reports a user owns, newest first.
pub struct ReportListing {
    gateway: Arc<PersistenceGateway>,
}

impl ReportListing {
    pub fn new(gateway: Arc<PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// The composite index per-user listing relies on.
    pub fn owner_index() -> IndexSpec {
        IndexSpec {
            collection: REPORTS.to_string(),
            equality_fields: vec![OWNER_FIELD.to_string()],
            order_field: CREATED_AT.to_string(),
            direction: Direction::Descending,
        }
    }

    fn owner_query(user_id: &str) -> DocumentQuery {
        DocumentQuery::new()
            .where_eq(OWNER_FIELD, user_id)
            .order_by(CREATED_AT, Direction::Descending)
    }

    /// All reports owned by `user_id`, ordered by `createdAt` descending.
    ///
    /// A blank user id yields an empty list without touching the store.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Report>, ListError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self
            .gateway
            .query(REPORTS, Self::owner_query(user_id))
            .await
            .map_err(|e| {
                let err = ListError::from(e);
                if let ListError::IndexRequired(spec) = &err {
                    warn!(index = %spec.key(), "report listing needs an undeclared index");
                }
                err
            })?;

        let reports = docs
            .into_iter()
            .map(Report::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(user = user_id, count = reports.len(), "listed reports");
        Ok(reports)
    }

    /// One report, only if `user_id` owns it.
    pub async fn get_for_user(&self, user_id: &str, id: &str) -> Result<Report, ListError> {
        let store = self.gateway.store().await?;
        let doc = store
            .get(REPORTS, id)
            .await?
            .ok_or_else(|| ListError::NotFound(id.to_string()))?;
        let report = Report::from_document(doc)?;

        // Foreign reports look exactly like missing ones.
        if report.user_id != user_id.trim() {
            return Err(ListError::NotFound(id.to_string()));
        }
        Ok(report)
    }
}
