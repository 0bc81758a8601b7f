// SPDX-License-Identifier: MPL-2.0

use crate::cache::CacheError;
use crate::cache::schema::SCHEMA;
use crate::config::{APP_NAME, DB_FILE_NAME};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Handle to the local comment database
#[derive(Clone)]
pub struct CacheDb {
    conn: Arc<Mutex<Connection>>,
}

impl CacheDb {
    /// Open or create the database at the default location
    /// Path: ~/.local/share/threadmood/reddit_comments.db
    pub fn open_default() -> Result<Self, CacheError> {
        let path = Self::default_path()?;
        Self::open(&path)
    }

    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Path(format!("failed to create data dir: {}", e)))?;
        }

        debug!("Opening comment database - path={}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Create the comment table if absent. Idempotent.
    pub fn ensure_schema(&self) -> Result<(), CacheError> {
        // All statements are CREATE IF NOT EXISTS
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// XDG data directory location of the database
    pub fn default_path() -> Result<PathBuf, CacheError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CacheError::Path("could not find data directory".to_string()))?;

        Ok(data_dir.join(APP_NAME).join(DB_FILE_NAME))
    }

    /// Access connection for operations
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache lock poisoned")
    }
}
