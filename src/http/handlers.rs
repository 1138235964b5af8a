//! Route handlers

use super::response::ApiError;
use crate::api::TruthLensApi;
use crate::claim::RawClaim;
use crate::error::ErrorKind;
use crate::profile::ProfileUpdate;
use crate::report::Report;
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tracing::warn;

/// Header carrying the authenticated principal's id.
pub const PRINCIPAL_HEADER: &str = "x-authenticated-user";

/// The caller, if the proxy authenticated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub Option<String>);

impl Principal {
    fn require(self) -> Result<String, ApiError> {
        self.0.ok_or_else(|| {
            ApiError::new(ErrorKind::Unauthenticated, "authentication required")
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Principal(user))
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::new(ErrorKind::InvalidInput, rejection.body_text())
}

#[derive(Serialize)]
pub struct ReportsBody {
    success: bool,
    reports: Vec<Report>,
}

#[derive(Serialize)]
pub struct SubmittedBody {
    success: bool,
    id: String,
    report: Report,
}

pub async fn list_reports(
    State(api): State<TruthLensApi>,
    principal: Principal,
) -> Result<Json<ReportsBody>, ApiError> {
    let reports = match principal.0 {
        Some(user) => api.list_reports(&user).await?,
        None => Vec::new(),
    };
    Ok(Json(ReportsBody {
        success: true,
        reports,
    }))
}

pub async fn submit_report(
    State(api): State<TruthLensApi>,
    principal: Principal,
    body: Result<Json<RawClaim>, JsonRejection>,
) -> Result<Json<SubmittedBody>, ApiError> {
    let user = principal.require()?;
    let Json(claim) = body.map_err(bad_body)?;

    let report = api.submit(&claim, &user).await.map_err(|e| {
        warn!(user = %user, kind = %e.kind(), error = %e, "submission failed");
        ApiError::from(e)
    })?;

    Ok(Json(SubmittedBody {
        success: true,
        id: report.id.to_string(),
        report,
    }))
}

pub async fn get_report(
    State(api): State<TruthLensApi>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = principal.require()?;
    let report = api.get_report(&user, &id).await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

pub async fn upsert_profile(
    State(api): State<TruthLensApi>,
    principal: Principal,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = principal.require()?;
    let Json(update) = body.map_err(bad_body)?;
    api.upsert_profile(&user, &update).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn ping(State(api): State<TruthLensApi>) -> Response {
    match api.ping().await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "document store reachable",
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "ping failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
