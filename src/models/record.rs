use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored payload owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    /// Record identifier, assigned by the store on insert
    pub id: Uuid,
    /// Owning user's id
    pub user_id: Uuid,
    /// Stored JSON text; may be empty
    pub payload: String,
}
