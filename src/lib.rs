//! User info service library
//!
//! Per-user preferences, sessions, saved searches and bags stored as JSON,
//! exported here for the binary and for tests.

pub mod config;
pub mod constants;
pub mod db;
pub mod envelope;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod version;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::create_router;
pub use store::{MemoryBackend, Stores};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
}

impl AppState {
    /// Create a new AppState with the given stores and configuration
    pub fn new(config: Config, stores: Stores) -> Self {
        Self { config, stores }
    }
}
