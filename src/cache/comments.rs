// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use crate::sentiment::SentimentLabel;
use rusqlite::params;
use rusqlite::types::Type;
use serde::Serialize;

/// A scored comment as persisted. Rows are immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub body: String,
    pub score: i64,
    pub created_utc: String,
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
}

/// Result of a single insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same id already exists and was left untouched
    Duplicate,
}

/// Cache operations for scored comments
pub struct CommentCache<'a> {
    db: &'a CacheDb,
}

impl<'a> CommentCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    /// Insert one record; an existing id is never overwritten
    #[allow(dead_code)]
    pub fn insert(&self, record: &CommentRecord) -> Result<InsertOutcome, CacheError> {
        let conn = self.db.conn();
        Self::insert_with(&conn, record)
    }

    /// Insert records in one transaction, returning how many were new
    pub fn upsert_batch(&self, records: &[CommentRecord]) -> Result<usize, CacheError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let mut inserted = 0;
        for record in records {
            if Self::insert_with(&tx, record)? == InsertOutcome::Inserted {
                inserted += 1;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// All rows of a post, most recent first
    pub fn load_by_post(&self, post_id: &str) -> Result<Vec<CommentRecord>, CacheError> {
        let conn = self.db.conn();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, post_id, body, score, created_utc, sentiment, sentiment_label
            FROM comments
            WHERE post_id = ?
            ORDER BY created_utc DESC
            "#,
        )?;

        let mut rows = stmt.query([post_id])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(Self::row_to_record(row)?);
        }

        Ok(records)
    }

    /// Number of stored rows for a post
    #[allow(dead_code)]
    pub fn count_by_post(&self, post_id: &str) -> Result<usize, CacheError> {
        let conn = self.db.conn();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?",
            [post_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn insert_with(
        conn: &rusqlite::Connection,
        record: &CommentRecord,
    ) -> Result<InsertOutcome, CacheError> {
        let changed = conn.execute(
            r#"
            INSERT INTO comments (id, post_id, body, score, created_utc, sentiment, sentiment_label)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO NOTHING
            "#,
            params![
                record.id,
                record.post_id,
                record.body,
                record.score,
                record.created_utc,
                record.sentiment,
                record.sentiment_label.as_str(),
            ],
        )?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    /// Convert a database row to a CommentRecord
    fn row_to_record(row: &rusqlite::Row) -> Result<CommentRecord, rusqlite::Error> {
        let label: String = row.get(6)?;
        let sentiment_label = label
            .parse::<SentimentLabel>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        Ok(CommentRecord {
            id: row.get(0)?,
            post_id: row.get(1)?,
            body: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            score: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
            created_utc: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            sentiment: row.get::<_, Option<f64>>(5)?.unwrap_or_default(),
            sentiment_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, post_id: &str, created_utc: &str, sentiment: f64) -> CommentRecord {
        CommentRecord {
            id: id.to_string(),
            post_id: post_id.to_string(),
            body: format!("body of {id}"),
            score: 1,
            created_utc: created_utc.to_string(),
            sentiment,
            sentiment_label: SentimentLabel::from_polarity(sentiment),
        }
    }

    #[test]
    fn test_insert_reports_duplicate() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = CommentCache::new(&db);
        let r = record("a", "p1", "2024-01-01T10:00:00", 0.5);

        assert_eq!(cache.insert(&r).unwrap(), InsertOutcome::Inserted);
        assert_eq!(cache.insert(&r).unwrap(), InsertOutcome::Duplicate);
        assert_eq!(cache.count_by_post("p1").unwrap(), 1);
    }

    #[test]
    fn test_upsert_batch_is_idempotent() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = CommentCache::new(&db);
        let batch = vec![
            record("a", "p1", "2024-01-01T10:00:00", 0.5),
            record("b", "p1", "2024-01-01T11:00:00", -0.5),
        ];

        assert_eq!(cache.upsert_batch(&batch).unwrap(), 2);
        assert_eq!(cache.upsert_batch(&batch).unwrap(), 0);
        assert_eq!(cache.count_by_post("p1").unwrap(), 2);
    }

    #[test]
    fn test_first_write_wins() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = CommentCache::new(&db);
        let original = record("a", "p1", "2024-01-01T10:00:00", 0.5);
        let mut refetched = original.clone();
        refetched.score = 99;

        cache.upsert_batch(&[original.clone()]).unwrap();
        assert_eq!(cache.upsert_batch(&[refetched]).unwrap(), 0);

        let stored = cache.load_by_post("p1").unwrap();
        assert_eq!(stored, vec![original]);
    }

    #[test]
    fn test_duplicates_within_one_batch_count_once() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = CommentCache::new(&db);
        let r = record("a", "p1", "2024-01-01T10:00:00", 0.0);

        assert_eq!(cache.upsert_batch(&[r.clone(), r]).unwrap(), 1);
    }

    #[test]
    fn test_load_by_post_orders_most_recent_first() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = CommentCache::new(&db);
        cache
            .upsert_batch(&[
                record("a", "p1", "2024-01-01T10:05:00", 0.3),
                record("b", "p1", "2024-01-01T11:10:00", 0.0),
                record("c", "p1", "2024-01-01T10:47:00", -0.2),
                record("d", "p2", "2024-01-02T09:00:00", 0.1),
            ])
            .unwrap();

        let loaded = cache.load_by_post("p1").unwrap();
        let ids: Vec<&str> = loaded.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(
            loaded
                .windows(2)
                .all(|w| w[0].created_utc >= w[1].created_utc)
        );
    }

    #[test]
    fn test_load_unknown_post_is_empty() {
        let db = CacheDb::open_in_memory().unwrap();
        assert!(CommentCache::new(&db).load_by_post("nope").unwrap().is_empty());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.db");

        {
            let db = CacheDb::open(&path).unwrap();
            CommentCache::new(&db)
                .upsert_batch(&[record("a", "p1", "2024-01-01T10:00:00", -0.75)])
                .unwrap();
        }

        let db = CacheDb::open(&path).unwrap();
        let loaded = CommentCache::new(&db).load_by_post("p1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sentiment_label, SentimentLabel::Negative);
    }
}
