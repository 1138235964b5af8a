//! Opening the document store from resolved credentials

use super::credentials::Credentials;
use crate::storage::{DocumentStore, OpenStore, SqliteStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Creates the one store connection the gateway owns.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> StorageResult<Arc<dyn DocumentStore>>;
}

/// Opens one SQLite database per project under a data directory.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    /// `None` keeps everything in memory.
    data_dir: Option<PathBuf>,
}

impl SqliteConnector {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self { data_dir: None }
    }

    /// Database file for a project.
    pub fn database_path(&self, project_id: &str) -> StorageResult<Option<PathBuf>> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidField(project_id.to_string()));
        }
        Ok(self
            .data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.db", project_id))))
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    async fn connect(&self, credentials: &Credentials) -> StorageResult<Arc<dyn DocumentStore>> {
        let path = self.database_path(&credentials.project_id)?;
        let store = tokio::task::spawn_blocking(move || -> StorageResult<SqliteStore> {
            match path {
                Some(path) => {
                    if let Some(dir) = path.parent() {
                        std::fs::create_dir_all(dir)?;
                    }
                    SqliteStore::open(path)
                }
                None => SqliteStore::open_in_memory(),
            }
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))??;

        Ok(Arc::new(store))
    }
}
