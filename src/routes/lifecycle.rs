//! Request lifecycle shared by every single-record resource.
//!
//! Each handler runs the same steps against its [`RecordStore`]: confirm the
//! user exists, then read, upsert or delete the user's one record. The upsert
//! is check-then-act: `has_record` followed by `insert` or `update`, with no
//! transaction around the pair.

use crate::error::{AppError, Result};
use crate::store::{RecordStore, StoreError};

/// Fail with [`AppError::NonUser`] unless `username` resolves to a user.
pub async fn require_user(store: &dyn RecordStore, username: &str) -> Result<()> {
    if store.user_exists(username).await? {
        Ok(())
    } else {
        Err(AppError::NonUser(username.to_string()))
    }
}

/// The user's stored payload, if they have one.
pub async fn fetch(store: &dyn RecordStore, username: &str) -> Result<Option<String>> {
    Ok(store.first_payload(username).await?)
}

/// Insert the payload if the user has no record yet, otherwise update it.
pub async fn upsert(store: &dyn RecordStore, username: &str, payload: &str) -> Result<()> {
    if store.has_record(username).await? {
        tracing::debug!(username, "Updating existing record");
        store.update(username, payload).await?;
    } else {
        tracing::debug!(username, "Inserting new record");
        store.insert(username, payload).await?;
    }
    Ok(())
}

/// Delete the user's record.
///
/// Unknown users, including ones removed mid-request, and users without a
/// record are all "nothing to do".
pub async fn remove(store: &dyn RecordStore, username: &str) -> Result<()> {
    if !store.user_exists(username).await? {
        tracing::info!(username, "Delete for non-existent user, nothing to do");
        return Ok(());
    }

    if !store.has_record(username).await? {
        return Ok(());
    }

    match store.delete(username).await {
        Ok(()) | Err(StoreError::UnknownUser(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::USER_PREFERENCES;
    use crate::store::MemoryBackend;

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let backend = MemoryBackend::new();
        backend.add_user("test-user").await;
        let store = backend.record_store(USER_PREFERENCES);

        upsert(&store, "test-user", r#"{"a":1}"#).await.unwrap();
        upsert(&store, "test-user", r#"{"a":2}"#).await.unwrap();

        let records = store.get_records("test-user").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, r#"{"a":2}"#);
    }

    #[tokio::test]
    async fn test_require_user_rejects_unknown() {
        let backend = MemoryBackend::new();
        let store = backend.record_store(USER_PREFERENCES);

        let result = require_user(&store, "nobody").await;
        assert!(matches!(result, Err(AppError::NonUser(u)) if u == "nobody"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.add_user("test-user").await;
        let store = backend.record_store(USER_PREFERENCES);

        remove(&store, "test-user").await.unwrap();
        remove(&store, "nobody").await.unwrap();

        upsert(&store, "test-user", "{}").await.unwrap();
        remove(&store, "test-user").await.unwrap();
        assert_eq!(fetch(&store, "test-user").await.unwrap(), None);
    }
}
