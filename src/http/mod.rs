//! HTTP surface over [`TruthLensApi`]
//!
//! Routes:
//! - `GET /reports`: the caller's reports, newest first
//! - `POST /reports`: submit a claim
//! - `GET /reports/{id}`: one of the caller's reports
//! - `POST /profile`: upsert the caller's profile
//! - `GET /ping`: store health
//!
//! The caller is identified by the `X-Authenticated-User` header, which the
//! authenticating proxy in front of this service sets.

mod handlers;
mod response;

pub use handlers::{Principal, PRINCIPAL_HEADER};
pub use response::ApiError;

use crate::api::TruthLensApi;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(api: TruthLensApi) -> Router {
    Router::new()
        .route(
            "/reports",
            get(handlers::list_reports).post(handlers::submit_report),
        )
        .route("/reports/{id}", get(handlers::get_report))
        .route("/profile", post(handlers::upsert_profile))
        .route("/ping", get(handlers::ping))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

/// Serve until Ctrl+C.
pub async fn serve(api: TruthLensApi, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("truthlens listening on {}", listener.local_addr()?);

    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("truthlens shutting down");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
