//! Shared state for request handlers.

use std::sync::{Arc, Mutex};

use att_core::Clock;
use att_db::Database;

use super::response::{ApiError, ApiErrorResponse};
use crate::config::Config;

/// Shared application state.
///
/// The database connection is not shareable across threads, so handlers reach
/// it through a mutex, one blocking task at a time.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    clock: Arc<dyn Clock>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            clock,
            config: Arc::new(config),
        }
    }

    /// Runs `task` against the database on the blocking thread pool.
    pub async fn with_db<T, F>(&self, task: F) -> Result<T, ApiErrorResponse>
    where
        F: FnOnce(&mut Database) -> Result<T, ApiErrorResponse> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut db = db.lock().map_err(|_| {
                ApiErrorResponse::internal(ApiError::new(
                    "STORAGE_ERROR",
                    "database lock poisoned by an earlier failure",
                ))
            })?;
            task(&mut db)
        })
        .await
        .map_err(|err| {
            ApiErrorResponse::internal(ApiError::with_details(
                "STORAGE_ERROR",
                "database task failed",
                err.to_string(),
            ))
        })?
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
