// SPDX-License-Identifier: MPL-2.0

mod comments;
mod db;
mod schema;

pub use comments::{CommentCache, CommentRecord, InsertOutcome};
pub use db::CacheDb;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database path error: {0}")]
    Path(String),
}
