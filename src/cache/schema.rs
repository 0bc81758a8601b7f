// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the comment store
pub const SCHEMA: &str = r#"
-- Database version for migrations
PRAGMA user_version = 1;

-- comments: one row per hashed comment id, never updated
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    post_id TEXT,
    body TEXT,
    score INTEGER,
    created_utc TEXT,
    sentiment REAL,
    sentiment_label TEXT
);

CREATE INDEX IF NOT EXISTS idx_comments_post_created ON comments(post_id, created_utc DESC);
"#;
