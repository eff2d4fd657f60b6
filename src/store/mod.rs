//! Persistence for per-user resources.
//!
//! Two capability traits cover everything the handlers need:
//! [`RecordStore`] for the single-record-per-user resources (preferences,
//! sessions, saved searches) and [`BagStore`] for bags. Each has a Postgres
//! implementation and an in-memory one with identical semantics.
//!
//! Usernames are resolved to user ids on every mutating call. The users
//! table belongs to an external system; nothing here creates users.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::tables::{USER_PREFERENCES, USER_SAVED_SEARCHES, USER_SESSIONS};
use crate::models::{BagContents, BagRecord, Record};

pub use memory::MemoryBackend;
pub use postgres::{PgBagStore, PgRecordStore};

/// Store error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("user {0} does not exist")]
    UnknownUser(String),

    #[error("record already exists for user {0}")]
    Conflict(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage for a resource that holds at most one payload per user.
///
/// Writers decide between [`insert`](RecordStore::insert) and
/// [`update`](RecordStore::update) by calling
/// [`has_record`](RecordStore::has_record) first. The two calls are not
/// atomic: concurrent first writes for the same user can both see "no
/// record". The schema's `UNIQUE (user_id)` makes the losing insert fail with
/// [`StoreError::Conflict`] instead of leaving a second row behind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// False when the username doesn't resolve; errors only on store failure.
    async fn user_exists(&self, username: &str) -> StoreResult<bool>;

    /// True if any row exists for the user, even one with an empty payload.
    async fn has_record(&self, username: &str) -> StoreResult<bool>;

    async fn get_records(&self, username: &str) -> StoreResult<Vec<Record>>;

    /// Insert a new row owned by the user and return its id.
    async fn insert(&self, username: &str, payload: &str) -> StoreResult<Uuid>;

    /// Replace the payload of the user's row. Affects nothing if there is none.
    async fn update(&self, username: &str, payload: &str) -> StoreResult<()>;

    /// Delete the user's row(s). Deleting nothing is not an error.
    async fn delete(&self, username: &str) -> StoreResult<()>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Payload of the first stored record, if any.
    async fn first_payload(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self
            .get_records(username)
            .await?
            .into_iter()
            .next()
            .map(|record| record.payload))
    }
}

/// Storage for bags, of which a user may have any number.
///
/// At most one of them is marked as the user's default. A marker pointing at
/// a bag that no longer exists is treated as absent.
#[async_trait]
pub trait BagStore: Send + Sync {
    async fn user_exists(&self, username: &str) -> StoreResult<bool>;

    async fn has_bags(&self, username: &str) -> StoreResult<bool>;

    async fn has_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<bool>;

    async fn get_bags(&self, username: &str) -> StoreResult<Vec<BagRecord>>;

    async fn get_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<Option<BagRecord>>;

    /// Add (never update) a bag for the user.
    async fn add_bag(&self, username: &str, contents: &BagContents) -> StoreResult<BagRecord>;

    async fn update_bag(
        &self,
        username: &str,
        bag_id: Uuid,
        contents: &BagContents,
    ) -> StoreResult<()>;

    async fn delete_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()>;

    async fn delete_all_bags(&self, username: &str) -> StoreResult<()>;

    /// The bag currently marked as default, if it still exists.
    async fn default_bag(&self, username: &str) -> StoreResult<Option<BagRecord>>;

    /// Mark `bag_id` as the user's default, replacing any previous marker.
    async fn set_default_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()>;

    /// Return the default bag, creating an empty one and marking it first if
    /// the user has none.
    async fn get_or_create_default_bag(&self, username: &str) -> StoreResult<BagRecord> {
        if let Some(bag) = self.default_bag(username).await? {
            return Ok(bag);
        }

        let bag = self.add_bag(username, &BagContents::new()).await?;
        self.set_default_bag(username, bag.id).await?;

        tracing::info!(username, bag_id = %bag.id, "Created default bag");

        Ok(bag)
    }
}

/// One store per resource type
#[derive(Clone)]
pub struct Stores {
    pub preferences: Arc<dyn RecordStore>,
    pub sessions: Arc<dyn RecordStore>,
    pub searches: Arc<dyn RecordStore>,
    pub bags: Arc<dyn BagStore>,
}

impl Stores {
    /// Stores backed by a PostgreSQL pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            preferences: Arc::new(PgRecordStore::new(pool.clone(), USER_PREFERENCES)),
            sessions: Arc::new(PgRecordStore::new(pool.clone(), USER_SESSIONS)),
            searches: Arc::new(PgRecordStore::new(pool.clone(), USER_SAVED_SEARCHES)),
            bags: Arc::new(PgBagStore::new(pool)),
        }
    }

    /// Stores sharing one in-memory backend
    pub fn memory(backend: &MemoryBackend) -> Self {
        Self {
            preferences: Arc::new(backend.record_store(USER_PREFERENCES)),
            sessions: Arc::new(backend.record_store(USER_SESSIONS)),
            searches: Arc::new(backend.record_store(USER_SAVED_SEARCHES)),
            bags: Arc::new(backend.bag_store()),
        }
    }

    /// Check connectivity; every store shares the same backend.
    pub async fn ping(&self) -> StoreResult<()> {
        self.preferences.ping().await
    }
}
