use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::lifecycle;
use super::validation::Username;
use crate::constants::{SAVED_SEARCHES_KEY, SEARCHES_GREETING};
use crate::error::{AppError, Result};
use crate::store::RecordStore;

/// Handler state for saved searches
#[derive(Clone)]
pub struct SearchesState {
    pub store: Arc<dyn RecordStore>,
}

/// Routes for `/searches/` and `/searches/:username`
pub fn router<S>(store: Arc<dyn RecordStore>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/searches/", get(|| async { SEARCHES_GREETING }))
        .route(
            "/searches/:username",
            get(get_searches)
                .put(put_searches)
                .post(put_searches)
                .delete(delete_searches),
        )
        .with_state(SearchesState { store })
}

/// Return the stored searches text as-is, or `{}`
///
/// GET /searches/:username
pub async fn get_searches(
    State(state): State<SearchesState>,
    Username(username): Username,
) -> Result<impl IntoResponse> {
    tracing::info!(service = "searches", username = %username, "Getting saved searches");

    lifecycle::require_user(state.store.as_ref(), &username).await?;
    let stored = lifecycle::fetch(state.store.as_ref(), &username)
        .await?
        .unwrap_or_else(|| "{}".to_string());

    Ok(([(header::CONTENT_TYPE, "application/json")], stored))
}

/// Store any JSON value verbatim and echo it back as `{"saved_searches": ...}`
///
/// PUT and POST /searches/:username
pub async fn put_searches(
    State(state): State<SearchesState>,
    Username(username): Username,
    body: Bytes,
) -> Result<Json<Value>> {
    tracing::info!(service = "searches", username = %username, "Storing saved searches");

    let payload = std::str::from_utf8(&body)
        .map_err(|e| AppError::BadRequest(format!("Error parsing body: {e}")))?;
    let parsed: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::BadRequest(format!("Error parsing body: {e}")))?;

    let store = state.store.as_ref();
    lifecycle::require_user(store, &username).await?;
    lifecycle::upsert(store, &username, payload).await?;

    let mut response = Map::new();
    response.insert(SAVED_SEARCHES_KEY.to_string(), parsed);
    Ok(Json(Value::Object(response)))
}

/// Delete the user's saved searches
///
/// DELETE /searches/:username
pub async fn delete_searches(
    State(state): State<SearchesState>,
    Username(username): Username,
) -> Result<StatusCode> {
    tracing::info!(service = "searches", username = %username, "Deleting saved searches");

    lifecycle::remove(state.store.as_ref(), &username).await?;
    Ok(StatusCode::OK)
}
