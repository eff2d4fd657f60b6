//! Bags: any number of free-form JSON collections per user, one of which
//! may be marked as the user's default.
//!
//! Usernames on these routes get the configured suffix appended before any
//! lookup.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::validation::{BagId, Username};
use crate::constants::BAGS_GREETING;
use crate::error::{AppError, Result};
use crate::models::{BagContents, BagList, BagRecord, NewBag};
use crate::store::BagStore;

/// Handler state for bags
#[derive(Clone)]
pub struct BagsState {
    pub store: Arc<dyn BagStore>,
    pub username_suffix: String,
}

impl BagsState {
    /// Append the username suffix unless it's already there.
    pub fn qualify(&self, username: &str) -> String {
        if username.ends_with(&self.username_suffix) {
            username.to_string()
        } else {
            format!("{}{}", username, self.username_suffix)
        }
    }

    /// Qualify the username and confirm the user exists.
    async fn user(&self, username: &str) -> Result<String> {
        let username = self.qualify(username);
        if !self.store.user_exists(&username).await? {
            return Err(AppError::NonUser(username));
        }
        Ok(username)
    }
}

/// Routes under `/bags`
pub fn router<S>(store: Arc<dyn BagStore>, username_suffix: String) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/bags/", get(|| async { BAGS_GREETING }))
        .route(
            "/bags/:username",
            get(get_bags)
                .head(has_bags)
                .put(add_bag)
                .delete(delete_all_bags),
        )
        .route(
            "/bags/:username/default",
            get(get_default_bag)
                .post(update_default_bag)
                .delete(delete_default_bag),
        )
        .route(
            "/bags/:username/:bag_id",
            get(get_bag)
                .head(has_bag)
                .post(update_bag)
                .delete(delete_bag),
        )
        .with_state(BagsState {
            store,
            username_suffix,
        })
}

fn parse_contents(body: &[u8]) -> Result<BagContents> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("failed to JSON decode body: {e}")))
}

fn bag_not_found(bag_id: uuid::Uuid, username: &str) -> AppError {
    AppError::NotFound(format!("bag {bag_id} not found for user {username}"))
}

/// 200 if the user has at least one bag, 404 otherwise. No body.
///
/// HEAD /bags/:username
pub async fn has_bags(
    State(state): State<BagsState>,
    Username(username): Username,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    if state.store.has_bags(&username).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// HEAD /bags/:username/:bag_id
pub async fn has_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    BagId(bag_id): BagId,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    if state.store.has_bag(&username, bag_id).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// GET /bags/:username
pub async fn get_bags(
    State(state): State<BagsState>,
    Username(username): Username,
) -> Result<Json<BagList>> {
    let username = state.user(&username).await?;
    tracing::info!(service = "bags", username = %username, "Listing bags");

    let bags = state.store.get_bags(&username).await?;
    Ok(Json(BagList { bags }))
}

/// GET /bags/:username/:bag_id
pub async fn get_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    BagId(bag_id): BagId,
) -> Result<Json<BagRecord>> {
    let username = state.user(&username).await?;

    if !state.store.has_bag(&username, bag_id).await? {
        return Err(bag_not_found(bag_id, &username));
    }

    state
        .store
        .get_bag(&username, bag_id)
        .await?
        .map(Json)
        .ok_or_else(|| bag_not_found(bag_id, &username))
}

/// Add a new bag whose contents are the request body
///
/// PUT /bags/:username
pub async fn add_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    body: Bytes,
) -> Result<Json<NewBag>> {
    let username = state.user(&username).await?;
    let contents = parse_contents(&body)?;

    let bag = state.store.add_bag(&username, &contents).await?;
    tracing::info!(service = "bags", username = %username, bag_id = %bag.id, "Added bag");

    Ok(Json(NewBag { id: bag.id }))
}

/// Replace the contents of an existing bag
///
/// POST /bags/:username/:bag_id
pub async fn update_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    BagId(bag_id): BagId,
    body: Bytes,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    if !state.store.has_bag(&username, bag_id).await? {
        return Err(bag_not_found(bag_id, &username));
    }

    let contents = parse_contents(&body)?;
    state.store.update_bag(&username, bag_id, &contents).await?;

    Ok(StatusCode::OK)
}

/// DELETE /bags/:username/:bag_id
pub async fn delete_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    BagId(bag_id): BagId,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    state.store.delete_bag(&username, bag_id).await?;
    tracing::info!(service = "bags", username = %username, bag_id = %bag_id, "Deleted bag");

    Ok(StatusCode::OK)
}

/// DELETE /bags/:username
pub async fn delete_all_bags(
    State(state): State<BagsState>,
    Username(username): Username,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    state.store.delete_all_bags(&username).await?;
    tracing::info!(service = "bags", username = %username, "Deleted all bags");

    Ok(StatusCode::OK)
}

/// Return the default bag, creating an empty one if the user has none.
///
/// GET /bags/:username/default
pub async fn get_default_bag(
    State(state): State<BagsState>,
    Username(username): Username,
) -> Result<Json<BagRecord>> {
    let username = state.user(&username).await?;

    let bag = state.store.get_or_create_default_bag(&username).await?;
    Ok(Json(bag))
}

/// Replace the default bag's contents, creating the default bag if needed
///
/// POST /bags/:username/default
pub async fn update_default_bag(
    State(state): State<BagsState>,
    Username(username): Username,
    body: Bytes,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;
    let contents = parse_contents(&body)?;

    let bag = state.store.get_or_create_default_bag(&username).await?;
    state.store.update_bag(&username, bag.id, &contents).await?;

    Ok(StatusCode::OK)
}

/// Delete the default bag. The next read recreates an empty one.
///
/// DELETE /bags/:username/default
pub async fn delete_default_bag(
    State(state): State<BagsState>,
    Username(username): Username,
) -> Result<StatusCode> {
    let username = state.user(&username).await?;

    if let Some(bag) = state.store.default_bag(&username).await? {
        state.store.delete_bag(&username, bag.id).await?;
        tracing::info!(service = "bags", username = %username, bag_id = %bag.id, "Deleted default bag");
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    fn state(suffix: &str) -> BagsState {
        BagsState {
            store: Arc::new(MemoryBackend::new().bag_store()),
            username_suffix: suffix.to_string(),
        }
    }

    #[test]
    fn test_qualify_appends_suffix() {
        let state = state("@iplantcollaborative.org");
        assert_eq!(state.qualify("ipcdev"), "ipcdev@iplantcollaborative.org");
    }

    #[test]
    fn test_qualify_keeps_existing_suffix() {
        let state = state("@iplantcollaborative.org");
        assert_eq!(
            state.qualify("ipcdev@iplantcollaborative.org"),
            "ipcdev@iplantcollaborative.org"
        );
    }

    #[test]
    fn test_empty_suffix_is_noop() {
        let state = state("");
        assert_eq!(state.qualify("ipcdev"), "ipcdev");
    }
}
