use std::sync::{Arc, RwLock};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared mutable state: the secret creator URL prefix, editable from the admin
/// dashboard without a restart.
pub struct AppState {
    pub creator_prefix: Arc<RwLock<String>>,
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod selection;
pub mod setup;
