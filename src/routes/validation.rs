use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::{ERR_MISSING_BAG_ID, ERR_MISSING_USERNAME};
use crate::error::AppError;

/// Look up one named path parameter, treating an empty segment as missing.
async fn path_param<S>(parts: &mut Parts, state: &S, name: &str) -> Option<String>
where
    S: Send + Sync,
{
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .ok()?;
    params.get(name).filter(|value| !value.is_empty()).cloned()
}

/// The `{username}` path segment
#[derive(Debug, Clone)]
pub struct Username(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Username
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        path_param(parts, state, "username")
            .await
            .map(Username)
            .ok_or_else(|| AppError::BadRequest(ERR_MISSING_USERNAME.to_string()))
    }
}

/// The `{bagID}` path segment, which must be a UUID
#[derive(Debug, Clone, Copy)]
pub struct BagId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BagId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let raw = path_param(parts, state, "bag_id")
            .await
            .ok_or_else(|| AppError::BadRequest(ERR_MISSING_BAG_ID.to_string()))?;

        Uuid::parse_str(&raw)
            .map(BagId)
            .map_err(|e| AppError::BadRequest(format!("invalid bag id {raw}: {e}")))
    }
}
