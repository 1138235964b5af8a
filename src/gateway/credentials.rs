//! Store credential resolution
//!
//! Sources are tried in a fixed order and the first one that yields
//! complete credentials wins:
//!
//! 1. `TRUTHLENS_SERVICE_ACCOUNT`: a JSON bundle with `project_id`,
//!    `client_email` and `private_key`
//! 2. `TRUTHLENS_CLIENT_EMAIL`, `TRUTHLENS_PRIVATE_KEY`, `TRUTHLENS_PROJECT_ID`
//! 3. platform default: a bundle file named by `GOOGLE_APPLICATION_CREDENTIALS`
//!
//! A source that is present but malformed is logged and skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

pub const SERVICE_ACCOUNT_VAR: &str = "TRUTHLENS_SERVICE_ACCOUNT";
pub const CLIENT_EMAIL_VAR: &str = "TRUTHLENS_CLIENT_EMAIL";
pub const PRIVATE_KEY_VAR: &str = "TRUTHLENS_PRIVATE_KEY";
pub const PROJECT_ID_VAR: &str = "TRUTHLENS_PROJECT_ID";
pub const PLATFORM_CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Where environment values come from.
pub trait EnvSource: Send + Sync {
    /// Value of `key`, or `None` when unset or blank.
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// Which strategy produced the credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    ServiceAccountBundle,
    EnvironmentTriple,
    PlatformDefault,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialSource::ServiceAccountBundle => "service account bundle",
            CredentialSource::EnvironmentTriple => "environment variables",
            CredentialSource::PlatformDefault => "platform default credentials",
        };
        f.write_str(name)
    }
}

/// Key material. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: SecretKey,
    pub source: CredentialSource,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{origin} is malformed: {reason}")]
    Malformed {
        origin: CredentialSource,
        reason: String,
    },

    #[error("cannot read credential file {path}: {error}")]
    Unreadable {
        path: PathBuf,
        error: std::io::Error,
    },
}

#[derive(Deserialize)]
struct ServiceAccountBundle {
    #[serde(default)]
    project_id: String,
    #[serde(default)]
    client_email: String,
    #[serde(default)]
    private_key: String,
}

/// Keys pasted into env files usually carry literal `\n` sequences.
fn unescape_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

fn build(
    source: CredentialSource,
    project_id: String,
    client_email: String,
    private_key: String,
) -> Result<Credentials, CredentialError> {
    let missing: Vec<&str> = [
        ("project_id", &project_id),
        ("client_email", &client_email),
        ("private_key", &private_key),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        return Err(CredentialError::Malformed {
            origin: source,
            reason: format!("missing {}", missing.join(", ")),
        });
    }

    Ok(Credentials {
        project_id,
        client_email,
        private_key: SecretKey::new(unescape_key(&private_key)),
        source,
    })
}

fn parse_bundle(raw: &str, source: CredentialSource) -> Result<Credentials, CredentialError> {
    let bundle: ServiceAccountBundle =
        serde_json::from_str(raw).map_err(|e| CredentialError::Malformed {
            origin: source,
            reason: e.to_string(),
        })?;
    build(source, bundle.project_id, bundle.client_email, bundle.private_key)
}

fn from_bundle(env: &dyn EnvSource) -> Result<Option<Credentials>, CredentialError> {
    env.var(SERVICE_ACCOUNT_VAR)
        .map(|raw| parse_bundle(&raw, CredentialSource::ServiceAccountBundle))
        .transpose()
}

fn from_triple(env: &dyn EnvSource) -> Result<Option<Credentials>, CredentialError> {
    let email = env.var(CLIENT_EMAIL_VAR);
    let key = env.var(PRIVATE_KEY_VAR);
    let project = env.var(PROJECT_ID_VAR);

    if email.is_none() && key.is_none() && project.is_none() {
        return Ok(None);
    }
    build(
        CredentialSource::EnvironmentTriple,
        project.unwrap_or_default(),
        email.unwrap_or_default(),
        key.unwrap_or_default(),
    )
    .map(Some)
}

fn from_platform(env: &dyn EnvSource) -> Result<Option<Credentials>, CredentialError> {
    let Some(path) = env.var(PLATFORM_CREDENTIALS_VAR).map(PathBuf::from) else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(&path)
        .map_err(|error| CredentialError::Unreadable { path, error })?;
    parse_bundle(&raw, CredentialSource::PlatformDefault).map(Some)
}

type Strategy = fn(&dyn EnvSource) -> Result<Option<Credentials>, CredentialError>;

const STRATEGIES: [(CredentialSource, Strategy); 3] = [
    (CredentialSource::ServiceAccountBundle, from_bundle),
    (CredentialSource::EnvironmentTriple, from_triple),
    (CredentialSource::PlatformDefault, from_platform),
];

/// Resolve credentials, first available source wins.
pub fn resolve(env: &dyn EnvSource) -> Option<Credentials> {
    for (source, strategy) in STRATEGIES {
        match strategy(env) {
            Ok(Some(credentials)) => return Some(credentials),
            Ok(None) => debug!(%source, "credential source not configured"),
            Err(e) => warn!(%source, error = %e, "skipping credential source"),
        }
    }
    None
}
