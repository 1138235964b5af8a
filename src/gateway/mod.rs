//! Persistence gateway: the process-wide owner of the store connection
//!
//! The connection is created lazily on first use, exactly once. Concurrent
//! first callers wait on the same initialization instead of racing to open
//! their own. If no credentials resolve, or the store cannot be opened, the
//! gateway settles into a disabled state and every operation fails fast
//! with [`BackendUnavailable`]. Disabled is terminal for the process.

mod connector;
pub mod credentials;

pub use connector::{SqliteConnector, StoreConnector};
pub use credentials::{CredentialSource, Credentials, EnvSource, ProcessEnv};

use crate::storage::{
    Document, DocumentQuery, DocumentStore, IndexSpec, StorageError, StorageResult, StoredDocument,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// The gateway never came up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document store unavailable: {reason}")]
pub struct BackendUnavailable {
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Unavailable(#[from] BackendUnavailable),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

enum State {
    Ready {
        store: StoreHandle,
        source: Option<CredentialSource>,
    },
    Disabled {
        reason: String,
    },
}

struct Initializer {
    env: Box<dyn EnvSource>,
    connector: Box<dyn StoreConnector>,
}

/// Process-wide store context, injected into the services that need it.
pub struct PersistenceGateway {
    init: Option<Initializer>,
    state: OnceCell<State>,
}

impl PersistenceGateway {
    /// A gateway that resolves credentials from `env` and opens the store
    /// through `connector` on first use.
    pub fn new(env: impl EnvSource + 'static, connector: impl StoreConnector + 'static) -> Self {
        Self {
            init: Some(Initializer {
                env: Box::new(env),
                connector: Box::new(connector),
            }),
            state: OnceCell::new(),
        }
    }

    /// A gateway over an already-open store.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            init: None,
            state: OnceCell::from(State::Ready {
                store: StoreHandle(store),
                source: None,
            }),
        }
    }

    /// A gateway that is disabled from the start.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            init: None,
            state: OnceCell::from(State::Disabled {
                reason: reason.into(),
            }),
        }
    }

    async fn state(&self) -> &State {
        self.state.get_or_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> State {
        let Some(init) = &self.init else {
            return State::Disabled {
                reason: "no store initializer configured".to_string(),
            };
        };

        let Some(credentials) = credentials::resolve(init.env.as_ref()) else {
            warn!("no document store credentials found; persistence is disabled");
            return State::Disabled {
                reason: format!(
                    "no store credentials configured (set {}, or {}/{}/{}, or {})",
                    credentials::SERVICE_ACCOUNT_VAR,
                    credentials::CLIENT_EMAIL_VAR,
                    credentials::PRIVATE_KEY_VAR,
                    credentials::PROJECT_ID_VAR,
                    credentials::PLATFORM_CREDENTIALS_VAR,
                ),
            };
        };

        match init.connector.connect(&credentials).await {
            Ok(store) => {
                info!(
                    project = %credentials.project_id,
                    source = %credentials.source,
                    "connected to document store"
                );
                State::Ready {
                    store: StoreHandle(store),
                    source: Some(credentials.source),
                }
            }
            Err(e) => {
                error!(project = %credentials.project_id, error = %e, "failed to open document store");
                State::Disabled {
                    reason: format!("failed to open document store: {}", e),
                }
            }
        }
    }

    /// The store handle, initializing on first call.
    pub async fn store(&self) -> Result<StoreHandle, BackendUnavailable> {
        match self.state().await {
            State::Ready { store, .. } => Ok(store.clone()),
            State::Disabled { reason } => Err(BackendUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(self.state().await, State::Ready { .. })
    }

    /// Which credential source initialized the gateway, if any.
    pub async fn credential_source(&self) -> Option<CredentialSource> {
        match self.state().await {
            State::Ready { source, .. } => *source,
            State::Disabled { .. } => None,
        }
    }

    pub async fn save(&self, collection: &str, data: Document) -> Result<StoredDocument, GatewayError> {
        Ok(self.store().await?.create(collection, data).await?)
    }

    pub async fn query(
        &self,
        collection: &str,
        query: DocumentQuery,
    ) -> Result<Vec<StoredDocument>, GatewayError> {
        Ok(self.store().await?.query(collection, query).await?)
    }

    pub async fn ensure_index(&self, index: IndexSpec) -> Result<bool, GatewayError> {
        Ok(self.store().await?.ensure_index(index).await?)
    }

    /// Initialized and able to perform a trivial read.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        Ok(self.store().await?.probe().await?)
    }
}

/// Async handle on the store. Blocking store calls run on tokio's blocking
/// pool; each call is a single atomic store operation.
#[derive(Clone)]
pub struct StoreHandle(Arc<dyn DocumentStore>);

impl StoreHandle {
    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> StorageResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.0);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    pub async fn create(&self, collection: &str, data: Document) -> StorageResult<StoredDocument> {
        let collection = collection.to_string();
        self.run(move |store| store.create(&collection, &data)).await
    }

    pub async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<StoredDocument>> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run(move |store| store.get(&collection, &id)).await
    }

    pub async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> StorageResult<StoredDocument> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run(move |store| store.merge(&collection, &id, &fields)).await
    }

    pub async fn query(
        &self,
        collection: &str,
        query: DocumentQuery,
    ) -> StorageResult<Vec<StoredDocument>> {
        let collection = collection.to_string();
        self.run(move |store| store.query(&collection, &query)).await
    }

    pub async fn ensure_index(&self, index: IndexSpec) -> StorageResult<bool> {
        self.run(move |store| store.ensure_index(&index)).await
    }

    pub async fn probe(&self) -> StorageResult<()> {
        self.run(|store| store.probe()).await
    }
}
