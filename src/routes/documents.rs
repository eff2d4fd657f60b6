//! Enveloped JSON documents: preferences and sessions.
//!
//! Both resources store one JSON object per user and differ only in their
//! envelope key, so a single set of handlers serves both.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::lifecycle;
use super::validation::Username;
use crate::constants::{PREFERENCES_GREETING, PREFERENCES_KEY, SESSIONS_GREETING, SESSION_KEY};
use crate::envelope::{Envelope, JsonMap};
use crate::error::{AppError, Result};
use crate::store::RecordStore;

/// Static description of a document resource
#[derive(Debug, Clone, Copy)]
pub struct DocumentResource {
    /// First path segment, e.g. `preferences`
    pub path: &'static str,
    pub envelope: Envelope,
    pub greeting: &'static str,
}

pub const PREFERENCES: DocumentResource = DocumentResource {
    path: "preferences",
    envelope: Envelope::new(PREFERENCES_KEY),
    greeting: PREFERENCES_GREETING,
};

pub const SESSIONS: DocumentResource = DocumentResource {
    path: "sessions",
    envelope: Envelope::new(SESSION_KEY),
    greeting: SESSIONS_GREETING,
};

/// Handler state for one document resource
#[derive(Clone)]
pub struct DocumentState {
    pub resource: DocumentResource,
    pub store: Arc<dyn RecordStore>,
}

/// Routes for `/{path}/` and `/{path}/:username`
pub fn router<S>(resource: DocumentResource, store: Arc<dyn RecordStore>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let greeting = resource.greeting;
    Router::new()
        .route(&format!("/{}/", resource.path), get(move || async move { greeting }))
        .route(
            &format!("/{}/:username", resource.path),
            get(get_document)
                .put(put_document)
                .post(put_document)
                .delete(delete_document),
        )
        .with_state(DocumentState { resource, store })
}

/// Read the stored document and normalize it.
async fn load(state: &DocumentState, username: &str, wrap: bool) -> Result<JsonMap> {
    let raw = lifecycle::fetch(state.store.as_ref(), username)
        .await
        .map_err(|e| {
            AppError::Errored(format!(
                "Error getting {} for username {}: {}",
                state.resource.path, username, e
            ))
        })?
        .unwrap_or_default();

    state.resource.envelope.convert(&raw, wrap).map_err(|e| {
        AppError::Errored(format!(
            "Error generating response for username {}: {}",
            username, e
        ))
    })
}

/// Return the user's document without its envelope, or `{}`
///
/// GET /{path}/:username
pub async fn get_document(
    State(state): State<DocumentState>,
    Username(username): Username,
) -> Result<Json<Value>> {
    tracing::info!(service = state.resource.path, username = %username, "Getting document");

    lifecycle::require_user(state.store.as_ref(), &username).await?;
    let document = load(&state, &username, false).await?;

    Ok(Json(Value::Object(document)))
}

/// Create or replace the user's document, answering with the enveloped form
///
/// PUT and POST /{path}/:username
///
/// A body that isn't a JSON object is answered with 500, matching how this
/// endpoint has always classified it.
pub async fn put_document(
    State(state): State<DocumentState>,
    Username(username): Username,
    body: Bytes,
) -> Result<Json<Value>> {
    tracing::info!(service = state.resource.path, username = %username, "Storing document");

    let store = state.store.as_ref();
    lifecycle::require_user(store, &username).await?;

    let payload = std::str::from_utf8(&body)
        .map_err(|e| AppError::Errored(format!("Error reading body: {e}")))?;
    serde_json::from_str::<JsonMap>(payload)
        .map_err(|e| AppError::Errored(format!("Error parsing request body: {e}")))?;

    lifecycle::upsert(store, &username, payload).await?;

    let document = load(&state, &username, true).await?;
    Ok(Json(Value::Object(document)))
}

/// Delete the user's document; deleting nothing is fine
///
/// DELETE /{path}/:username
pub async fn delete_document(
    State(state): State<DocumentState>,
    Username(username): Username,
) -> Result<StatusCode> {
    tracing::info!(service = state.resource.path, username = %username, "Deleting document");

    lifecycle::remove(state.store.as_ref(), &username).await?;
    Ok(StatusCode::OK)
}
