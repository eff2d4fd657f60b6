//! PostgreSQL-backed stores.
//!
//! Every query joins through the external `users` table by username. Table
//! and column names come only from [`RecordTable`] constants.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{BagStore, RecordStore, StoreError, StoreResult};
use crate::db::RecordTable;
use crate::models::{BagContents, BagRecord, Record};

/// Look up the id for `username`, if the user exists.
async fn lookup_user_id(pool: &PgPool, username: &str) -> StoreResult<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Resolve `username` to a user id, failing if the user doesn't exist.
async fn resolve_user_id(pool: &PgPool, username: &str) -> StoreResult<Uuid> {
    lookup_user_id(pool, username)
        .await?
        .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// SQL for one [`RecordTable`], rendered once at construction
#[derive(Debug, Clone)]
struct RecordQueries {
    has: String,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl RecordQueries {
    fn new(table: RecordTable) -> Self {
        let RecordTable { name, column } = table;
        Self {
            has: format!(
                "SELECT EXISTS(
                    SELECT 1
                      FROM {name} r
                      JOIN users u ON r.user_id = u.id
                     WHERE u.username = $1)"
            ),
            select: format!(
                "SELECT r.id, r.user_id, COALESCE(r.{column}, '') AS payload
                   FROM {name} r
                   JOIN users u ON r.user_id = u.id
                  WHERE u.username = $1"
            ),
            insert: format!("INSERT INTO {name} (user_id, {column}) VALUES ($1, $2) RETURNING id"),
            update: format!("UPDATE ONLY {name} SET {column} = $2 WHERE user_id = $1"),
            delete: format!("DELETE FROM ONLY {name} WHERE user_id = $1"),
        }
    }
}

/// [`RecordStore`] over one single-record-per-user table
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    table: RecordTable,
    queries: RecordQueries,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, table: RecordTable) -> Self {
        Self {
            pool,
            table,
            queries: RecordQueries::new(table),
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(lookup_user_id(&self.pool, username).await?.is_some())
    }

    async fn has_record(&self, username: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&self.queries.has)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn get_records(&self, username: &str) -> StoreResult<Vec<Record>> {
        let records = sqlx::query_as::<_, Record>(&self.queries.select)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn insert(&self, username: &str, payload: &str) -> StoreResult<Uuid> {
        let user_id = resolve_user_id(&self.pool, username).await?;

        let inserted = sqlx::query_scalar::<_, Uuid>(&self.queries.insert)
            .bind(user_id)
            .bind(payload)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(
                    table = self.table.name,
                    username,
                    "Concurrent insert lost to an existing record"
                );
                Err(StoreError::Conflict(username.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, username: &str, payload: &str) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query(&self.queries.update)
            .bind(user_id)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, username: &str) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query(&self.queries.delete)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Row shape for the `bags` table
#[derive(Debug, FromRow)]
struct DbBag {
    id: Uuid,
    contents: Json<BagContents>,
    user_id: Uuid,
}

impl From<DbBag> for BagRecord {
    fn from(row: DbBag) -> Self {
        BagRecord {
            id: row.id,
            contents: row.contents.0,
            user_id: row.user_id,
        }
    }
}

/// [`BagStore`] over the `bags` and `default_bags` tables
///
/// `default_bags.bag_id` references `bags.id` with `ON DELETE CASCADE`, so
/// deleting the default bag also removes its marker.
#[derive(Debug, Clone)]
pub struct PgBagStore {
    pool: PgPool,
}

impl PgBagStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BagStore for PgBagStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(lookup_user_id(&self.pool, username).await?.is_some())
    }

    async fn has_bags(&self, username: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1
                  FROM bags b
                  JOIN users u ON b.user_id = u.id
                 WHERE u.username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn has_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1
                  FROM bags b
                  JOIN users u ON b.user_id = u.id
                 WHERE u.username = $1
                   AND b.id = $2)",
        )
        .bind(username)
        .bind(bag_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn get_bags(&self, username: &str) -> StoreResult<Vec<BagRecord>> {
        let rows = sqlx::query_as::<_, DbBag>(
            "SELECT b.id, b.contents, b.user_id
               FROM bags b
               JOIN users u ON b.user_id = u.id
              WHERE u.username = $1",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BagRecord::from).collect())
    }

    async fn get_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<Option<BagRecord>> {
        let row = sqlx::query_as::<_, DbBag>(
            "SELECT b.id, b.contents, b.user_id
               FROM bags b
               JOIN users u ON b.user_id = u.id
              WHERE u.username = $1
                AND b.id = $2",
        )
        .bind(username)
        .bind(bag_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BagRecord::from))
    }

    async fn add_bag(&self, username: &str, contents: &BagContents) -> StoreResult<BagRecord> {
        let user_id = resolve_user_id(&self.pool, username).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO bags (contents, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(Json(contents))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BagRecord {
            id,
            contents: contents.clone(),
            user_id,
        })
    }

    async fn update_bag(
        &self,
        username: &str,
        bag_id: Uuid,
        contents: &BagContents,
    ) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query("UPDATE ONLY bags SET contents = $1 WHERE id = $2 AND user_id = $3")
            .bind(Json(contents))
            .bind(bag_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query("DELETE FROM ONLY bags WHERE id = $1 AND user_id = $2")
            .bind(bag_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_bags(&self, username: &str) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query("DELETE FROM ONLY bags WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn default_bag(&self, username: &str) -> StoreResult<Option<BagRecord>> {
        let row = sqlx::query_as::<_, DbBag>(
            "SELECT b.id, b.contents, b.user_id
               FROM bags b
               JOIN default_bags d ON b.id = d.bag_id
               JOIN users u ON d.user_id = u.id
              WHERE u.username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BagRecord::from))
    }

    async fn set_default_bag(&self, username: &str, bag_id: Uuid) -> StoreResult<()> {
        let user_id = resolve_user_id(&self.pool, username).await?;
        sqlx::query(
            "INSERT INTO default_bags (user_id, bag_id) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET bag_id = EXCLUDED.bag_id",
        )
        .bind(user_id)
        .bind(bag_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
