/// A single-record-per-user table holding one text payload column
///
/// Only the constants below are ever interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordTable {
    pub name: &'static str,
    pub column: &'static str,
}

/// Preferences table: user_id -> preferences JSON text
pub const USER_PREFERENCES: RecordTable = RecordTable {
    name: "user_preferences",
    column: "preferences",
};

/// Sessions table: user_id -> session JSON text
pub const USER_SESSIONS: RecordTable = RecordTable {
    name: "user_sessions",
    column: "session",
};

/// Saved searches table: user_id -> raw saved searches text
pub const USER_SAVED_SEARCHES: RecordTable = RecordTable {
    name: "user_saved_searches",
    column: "saved_searches",
};

