//! User profile upsert

use crate::error::ProfileError;
use crate::gateway::PersistenceGateway;
use crate::storage::{Document, StoredDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Collection holding user profiles, keyed by principal id.
pub const USERS: &str = "users";

/// Profile fields a principal may supply. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    fn from_document(doc: StoredDocument) -> Self {
        let text = |key: &str| doc.data.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            uid: doc.id.clone(),
            display_name: text("displayName"),
            email: text("email"),
            photo_url: text("photoURL"),
            created_at: doc.created_at,
        }
    }
}

pub struct ProfileService {
    gateway: Arc<PersistenceGateway>,
}

impl ProfileService {
    pub fn new(gateway: Arc<PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Create or merge `users/{uid}`. Re-applying the same update is a no-op.
    pub async fn upsert(&self, uid: &str, update: &ProfileUpdate) -> Result<UserProfile, ProfileError> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(ProfileError::Unauthenticated);
        }

        let mut fields = Document::new();
        fields.insert("uid".into(), Value::String(uid.to_string()));
        for (key, value) in [
            ("displayName", &update.display_name),
            ("email", &update.email),
            ("photoURL", &update.photo_url),
        ] {
            if let Some(value) = value {
                fields.insert(key.into(), Value::String(value.clone()));
            }
        }

        let store = self.gateway.store().await?;
        let stored = store.merge(USERS, uid, fields).await?;
        debug!(user = uid, "profile upserted");
        Ok(UserProfile::from_document(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::{DocumentStore, OpenStore, SqliteStore};

    fn setup() -> (Arc<SqliteStore>, ProfileService) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let gateway = Arc::new(PersistenceGateway::with_store(store.clone()));
        (store, ProfileService::new(gateway))
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let (store, service) = setup();
        let update = ProfileUpdate {
            display_name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            photo_url: None,
        };

        let first = service.upsert("u1", &update).await.unwrap();
        let before = store.get(USERS, "u1").unwrap().unwrap();
        let second = service.upsert("u1", &update).await.unwrap();
        let after = store.get(USERS, "u1").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert_eq!(first.uid, "u1");
        assert_eq!(first.photo_url, None);
    }

    #[tokio::test]
    async fn absent_fields_keep_stored_values() {
        let (_, service) = setup();
        service
            .upsert(
                "u1",
                &ProfileUpdate {
                    display_name: Some("Ada".into()),
                    email: Some("ada@example.com".into()),
                    photo_url: Some("https://img.example/ada.png".into()),
                },
            )
            .await
            .unwrap();

        let updated = service
            .upsert(
                "u1",
                &ProfileUpdate {
                    display_name: Some("Ada L.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Ada L."));
        assert_eq!(updated.email.as_deref(), Some("ada@example.com"));
        assert_eq!(updated.photo_url.as_deref(), Some("https://img.example/ada.png"));
    }

    #[tokio::test]
    async fn blank_uid_is_rejected() {
        let (_, service) = setup();
        let err = service.upsert(" ", &ProfileUpdate::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn update_decodes_wire_names() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"displayName":"Ada","photoURL":"https://img.example/a.png"}"#)
                .unwrap();
        assert_eq!(update.display_name.as_deref(), Some("Ada"));
        assert_eq!(update.email, None);
        assert_eq!(update.photo_url.as_deref(), Some("https://img.example/a.png"));
    }
}
