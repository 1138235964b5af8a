//! Runtime configuration and service wiring

use crate::api::TruthLensApi;
use crate::gateway::{EnvSource, PersistenceGateway, SqliteConnector};
use crate::verify::{ClaimVerifier, HttpVerifier, TimeoutVerifier, UnconfiguredVerifier, VerifyError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Get the default data directory (~/.local/share/truthlens)
pub fn default_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("truthlens")
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    /// Where per-project store files live; `None` keeps the store in memory.
    pub data_dir: Option<PathBuf>,
    pub verifier_url: Option<Url>,
    pub verifier_key: Option<String>,
    pub verifier_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: Some(default_data_dir()),
            verifier_url: None,
            verifier_key: None,
            verifier_timeout: None,
        }
    }
}

impl AppConfig {
    /// The verifier described by this config.
    ///
    /// Without an endpoint the service still starts, but submissions fail
    /// with a verification error.
    pub fn build_verifier(&self) -> Result<Arc<dyn ClaimVerifier>, VerifyError> {
        let Some(url) = &self.verifier_url else {
            warn!("no verifier endpoint configured; submissions will fail");
            return Ok(Arc::new(UnconfiguredVerifier));
        };

        let http = HttpVerifier::new(url.clone(), self.verifier_key.clone())?;
        info!(endpoint = %url, timeout = ?self.verifier_timeout, "using HTTP verifier");
        Ok(match self.verifier_timeout {
            Some(limit) => Arc::new(TimeoutVerifier::new(http, limit)),
            None => Arc::new(http),
        })
    }

    /// A gateway that resolves credentials from `env` on first use.
    pub fn build_gateway(&self, env: impl EnvSource + 'static) -> PersistenceGateway {
        let connector = match &self.data_dir {
            Some(dir) => SqliteConnector::new(dir),
            None => SqliteConnector::in_memory(),
        };
        PersistenceGateway::new(env, connector)
    }

    pub fn build_api(&self, env: impl EnvSource + 'static) -> Result<TruthLensApi, VerifyError> {
        let verifier = self.build_verifier()?;
        Ok(TruthLensApi::new(Arc::new(self.build_gateway(env)), verifier))
    }
}
