//! In-memory stores for tests and local development.
//!
//! Mirrors the Postgres schema closely enough that handlers can't tell the
//! difference: at most one record per user per [`RecordTable`], bags keyed by
//! id, and a default-bag marker that disappears with its bag.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BagStore, RecordStore, StoreError, StoreResult};
use crate::db::RecordTable;
use crate::models::{BagContents, BagRecord, Record};

#[derive(Debug, Default)]
struct MemoryState {
    /// username -> user id
    users: HashMap<String, Uuid>,
    records: HashMap<RecordTable, Vec<Record>>,
    bags: Vec<BagRecord>,
    /// user id -> default bag id
    default_bags: HashMap<Uuid, Uuid>,
}

impl MemoryState {
    fn user_id(&self, username: &str) -> Option<Uuid> {
        self.users.get(username).copied()
    }

    fn resolve(&self, username: &str) -> StoreResult<Uuid> {
        self.user_id(username)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    fn user_records(&self, table: RecordTable, username: &str) -> Vec<Record> {
        let Some(user_id) = self.user_id(username) else {
            return Vec::new();
        };
        self.records
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn user_bags(&self, username: &str) -> impl Iterator<Item = &BagRecord> {
        let user_id = self.user_id(username);
        self.bags
            .iter()
            .filter(move |bag| Some(bag.user_id) == user_id)
    }
}

/// Shared in-memory backend; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, returning its id. Re-adding returns the existing id.
    pub async fn add_user(&self, username: &str) -> Uuid {
        let mut state = self.state.lock().await;
        *state
            .users
            .entry(username.to_string())
            .or_insert_with(Uuid::new_v4)
    }

    /// Forget a user. Their rows stay behind, as they would in the database
    /// until the owning system cleans up.
    pub async fn remove_user(&self, username: &str) {
        self.state.lock().await.users.remove(username);
    }

    pub fn record_store(&self, table: RecordTable) -> MemoryRecordStore {
        MemoryRecordStore {
            backend: self.clone(),
            table,
        }
    }

    pub fn bag_store(&self) -> MemoryBagStore {
        MemoryBagStore {
            backend: self.clone(),
        }
    }
}

/// [`RecordStore`] over one in-memory table
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    backend: MemoryBackend,
    table: RecordTable,
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        let state = self.backend.state.lock().await;
        Ok(state.user_id(username).is_some())
    }

    async fn has_record(&self, username: &str) -> StoreResult<bool> {
        let state = self.backend.state.lock().await;
        Ok(!state.user_records(self.table, username).is_empty())
    }

    async fn get_records(&self, username: &str) -> StoreResult<Vec<Record>> {
        let state = self.backend.state.lock().await;
        Ok(state.user_records(self.table, username))
    }

    async fn insert(&self, username: &str, payload: &str) -> StoreResult<Uuid> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        let rows = state.records.entry(self.table).or_default();
        if rows.iter().any(|r| r.user_id == user_id) {
            return Err(StoreError::Conflict(username.to_string()));
        }

        let id = Uuid::new_v4();
        rows.push(Record {
            id,
            user_id,
            payload: payload.to_string(),
        });
        Ok(id)
    }

    async fn update(&self, username: &str, payload: &str) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        if let Some(rows) = state.records.get_mut(&self.table) {
            for row in rows.iter_mut().filter(|r| r.user_id == user_id) {
                row.payload = payload.to_string();
            }
        }
        Ok(())
    }

    async fn delete(&self, username: &str) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        if let Some(rows) = state.records.get_mut(&self.table) {
            rows.retain(|r| r.user_id != user_id);
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// [`BagStore`] over the in-memory backend
#[derive(Debug, Clone)]
pub struct MemoryBagStore {
    backend: MemoryBackend,
}

#[async_trait]
impl BagStore for MemoryBagStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        let state = self.backend.state.lock().await;
        Ok(state.user_id(username).is_some())
    }

    async fn has_bags(&self, username: &str) -> StoreResult<bool> {
        let state = self.backend.state.lock().await;
        let has_bags = state.user_bags(username).next().is_some();
        Ok(has_bags)
    }

    async fn has_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<bool> {
        let state = self.backend.state.lock().await;
        let has_bag = state.user_bags(username).any(|bag| bag.id == bag_id);
        Ok(has_bag)
    }

    async fn get_bags(&self, username: &str) -> StoreResult<Vec<BagRecord>> {
        let state = self.backend.state.lock().await;
        let bags = state.user_bags(username).cloned().collect();
        Ok(bags)
    }

    async fn get_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<Option<BagRecord>> {
        let state = self.backend.state.lock().await;
        let bag = state.user_bags(username).find(|bag| bag.id == bag_id).cloned();
        Ok(bag)
    }

    async fn add_bag(&self, username: &str, contents: &BagContents) -> StoreResult<BagRecord> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        let bag = BagRecord {
            id: Uuid::new_v4(),
            contents: contents.clone(),
            user_id,
        };
        state.bags.push(bag.clone());
        Ok(bag)
    }

    async fn update_bag(
        &self,
        username: &str,
        bag_id: Uuid,
        contents: &BagContents,
    ) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        if let Some(bag) = state
            .bags
            .iter_mut()
            .find(|bag| bag.id == bag_id && bag.user_id == user_id)
        {
            bag.contents = contents.clone();
        }
        Ok(())
    }

    async fn delete_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        let before = state.bags.len();
        state
            .bags
            .retain(|bag| !(bag.id == bag_id && bag.user_id == user_id));
        // Cascade to the marker, like the foreign key does
        if state.bags.len() != before {
            state.default_bags.retain(|_, marked| *marked != bag_id);
        }
        Ok(())
    }

    async fn delete_all_bags(&self, username: &str) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;

        state.bags.retain(|bag| bag.user_id != user_id);
        state.default_bags.remove(&user_id);
        Ok(())
    }

    async fn default_bag(&self, username: &str) -> StoreResult<Option<BagRecord>> {
        let state = self.backend.state.lock().await;
        let Some(user_id) = state.user_id(username) else {
            return Ok(None);
        };
        let Some(bag_id) = state.default_bags.get(&user_id) else {
            return Ok(None);
        };
        let bag = state.bags.iter().find(|bag| bag.id == *bag_id).cloned();
        Ok(bag)
    }

    async fn set_default_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()> {
        let mut state = self.backend.state.lock().await;
        let user_id = state.resolve(username)?;
        state.default_bags.insert(user_id, bag_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::{USER_PREFERENCES, USER_SESSIONS};
    use serde_json::json;

    const USER: &str = "test-user";

    async fn backend_with_user() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.add_user(USER).await;
        backend
    }

    fn contents(value: serde_json::Value) -> BagContents {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_user_exists() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        assert!(store.user_exists(USER).await.unwrap());
        assert!(!store.user_exists("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_user_is_stable() {
        let backend = MemoryBackend::new();
        let first = backend.add_user(USER).await;
        let second = backend.add_user(USER).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_payload_counts_as_record() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        store.insert(USER, "").await.unwrap();

        assert!(store.has_record(USER).await.unwrap());
        assert_eq!(store.first_payload(USER).await.unwrap(), Some(String::new()));
    }

    #[tokio::test]
    async fn test_insert_unknown_user_fails() {
        let backend = MemoryBackend::new();
        let store = backend.record_store(USER_PREFERENCES);

        let result = store.insert("nobody", "{}").await;
        assert!(matches!(result, Err(StoreError::UnknownUser(u)) if u == "nobody"));
    }

    #[tokio::test]
    async fn test_second_insert_conflicts() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        store.insert(USER, r#"{"a":1}"#).await.unwrap();
        let result = store.insert(USER, r#"{"a":2}"#).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_records(USER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_record_is_noop() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        store.update(USER, r#"{"a":1}"#).await.unwrap();

        assert!(!store.has_record(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_payload() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        let id = store.insert(USER, r#"{"a":1}"#).await.unwrap();
        store.update(USER, r#"{"a":2}"#).await.unwrap();

        let records = store.get_records(USER).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].payload, r#"{"a":2}"#);
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_noop() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        store.delete(USER).await.unwrap();
        assert!(store.get_records(USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tables_are_isolated() {
        let backend = backend_with_user().await;
        let prefs = backend.record_store(USER_PREFERENCES);
        let sessions = backend.record_store(USER_SESSIONS);

        prefs.insert(USER, r#"{"a":1}"#).await.unwrap();

        assert!(prefs.has_record(USER).await.unwrap());
        assert!(!sessions.has_record(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_mutation_after_user_removed_fails() {
        let backend = backend_with_user().await;
        let store = backend.record_store(USER_PREFERENCES);

        assert!(store.user_exists(USER).await.unwrap());
        backend.remove_user(USER).await;

        assert!(matches!(
            store.delete(USER).await,
            Err(StoreError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_bags_are_scoped_to_user() {
        let backend = backend_with_user().await;
        backend.add_user("other-user").await;
        let store = backend.bag_store();

        let bag = store
            .add_bag(USER, &contents(json!({ "a": 1 })))
            .await
            .unwrap();

        assert!(store.has_bags(USER).await.unwrap());
        assert!(!store.has_bags("other-user").await.unwrap());
        assert!(!store.has_bag("other-user", bag.id).await.unwrap());
        assert_eq!(store.get_bag("other-user", bag.id).await.unwrap(), None);

        // Another user can't touch it either
        store.delete_bag("other-user", bag.id).await.unwrap();
        assert!(store.has_bag(USER, bag.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_bag_created_once() {
        let backend = backend_with_user().await;
        let store = backend.bag_store();

        let first = store.get_or_create_default_bag(USER).await.unwrap();
        let second = store.get_or_create_default_bag(USER).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.contents.is_empty());
        assert_eq!(store.get_bags(USER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_default_bag_is_recreated() {
        let backend = backend_with_user().await;
        let store = backend.bag_store();

        let original = store.get_or_create_default_bag(USER).await.unwrap();
        store.delete_bag(USER, original.id).await.unwrap();

        assert_eq!(store.default_bag(USER).await.unwrap(), None);

        let replacement = store.get_or_create_default_bag(USER).await.unwrap();
        assert_ne!(original.id, replacement.id);
    }

    #[tokio::test]
    async fn test_set_default_bag_replaces_marker() {
        let backend = backend_with_user().await;
        let store = backend.bag_store();

        let first = store.add_bag(USER, &BagContents::new()).await.unwrap();
        let second = store
            .add_bag(USER, &contents(json!({ "b": 2 })))
            .await
            .unwrap();

        store.set_default_bag(USER, first.id).await.unwrap();
        store.set_default_bag(USER, second.id).await.unwrap();

        let default = store.default_bag(USER).await.unwrap().unwrap();
        assert_eq!(default.id, second.id);
    }

    #[tokio::test]
    async fn test_delete_all_bags() {
        let backend = backend_with_user().await;
        let store = backend.bag_store();

        store.get_or_create_default_bag(USER).await.unwrap();
        store.add_bag(USER, &BagContents::new()).await.unwrap();
        store.delete_all_bags(USER).await.unwrap();

        assert!(!store.has_bags(USER).await.unwrap());
        assert_eq!(store.default_bag(USER).await.unwrap(), None);
    }
}
