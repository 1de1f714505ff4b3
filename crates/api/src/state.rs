use std::sync::Arc;

use fitcoach_db::store::JobStore;
use fitcoach_worker::dispatcher::JobDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: fitcoach_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Job Store used for every job read and write.
    pub jobs: Arc<dyn JobStore>,
    /// Runs one sweep per cron call.
    pub dispatcher: Arc<JobDispatcher>,
}
