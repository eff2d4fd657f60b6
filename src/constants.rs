/// Envelope key for stored preferences documents
pub const PREFERENCES_KEY: &str = "preferences";

/// Envelope key for stored session documents
pub const SESSION_KEY: &str = "session";

/// Key used when echoing saved searches back after a write
pub const SAVED_SEARCHES_KEY: &str = "saved_searches";

/// Suffix appended to bag usernames that don't already carry it
pub const DEFAULT_USERNAME_SUFFIX: &str = "@iplantcollaborative.org";

/// Port the service listens on when SERVER_PORT is unset
pub const DEFAULT_SERVER_PORT: u16 = 60000;

/// DATABASE_URL scheme that selects the in-memory store
pub const MEMORY_DATABASE_SCHEME: &str = "memory://";

// =============================================================================
// Greetings
// =============================================================================

pub const ROOT_GREETING: &str = "Hello from user-info.\n";
pub const PREFERENCES_GREETING: &str = "Hello from user-preferences.\n";
pub const SESSIONS_GREETING: &str = "Hello from user-sessions.\n";
pub const SEARCHES_GREETING: &str = "Hello from saved-searches.\n";
pub const BAGS_GREETING: &str = "Hello from the bags handler";

// =============================================================================
// Error Messages
// =============================================================================

/// Returned when the username path segment is absent or empty
pub const ERR_MISSING_USERNAME: &str = "Missing username in URL";

/// Returned when the bag id path segment is absent
pub const ERR_MISSING_BAG_ID: &str = "missing bagID in the URL";
