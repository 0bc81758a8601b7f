// SPDX-License-Identifier: MPL-2.0

//! Fetch, score, store and reload the comments of one post.

use crate::cache::{CacheDb, CacheError, CommentCache, CommentRecord};
use crate::reddit::{ClientError, CommentSource, FetchedComment};
use crate::sentiment::{Scorer, SentimentLabel};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ClientError),
    #[error("store failed: {0}")]
    Store(#[from] CacheError),
}

/// Outcome of one full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Rows that were new this run
    pub inserted: usize,
    /// Every stored row of the post, most recent first
    pub comments: Vec<CommentRecord>,
}

/// One fetch-score-store-reload pass, as driven by the refresh controller.
pub trait Pipeline {
    fn run(&mut self, post_id: &str) -> Result<PipelineRun, PipelineError>;
}

pub struct CommentPipeline<'a, S: CommentSource, Sc: Scorer> {
    source: &'a S,
    scorer: &'a Sc,
    db: &'a CacheDb,
}

impl<'a, S: CommentSource, Sc: Scorer> CommentPipeline<'a, S, Sc> {
    pub fn new(source: &'a S, scorer: &'a Sc, db: &'a CacheDb) -> Self {
        Self { source, scorer, db }
    }
}

/// Score a fetched comment. The label is always derived from the polarity.
pub fn score_comment<Sc: Scorer + ?Sized>(scorer: &Sc, comment: FetchedComment) -> CommentRecord {
    let sentiment = scorer.polarity(&comment.body);

    CommentRecord {
        id: comment.id,
        post_id: comment.post_id,
        body: comment.body,
        score: comment.score,
        created_utc: comment.created_utc,
        sentiment,
        sentiment_label: SentimentLabel::from_polarity(sentiment),
    }
}

impl<S: CommentSource, Sc: Scorer> Pipeline for CommentPipeline<'_, S, Sc> {
    fn run(&mut self, post_id: &str) -> Result<PipelineRun, PipelineError> {
        let fetched = self.source.fetch(post_id)?;
        let fetched_count = fetched.len();

        let records: Vec<CommentRecord> = fetched
            .into_iter()
            .map(|c| score_comment(self.scorer, c))
            .collect();

        self.db.ensure_schema()?;
        let cache = CommentCache::new(self.db);
        let inserted = cache.upsert_batch(&records)?;
        let comments = cache.load_by_post(post_id)?;

        info!(
            "Pipeline run - post={}, fetched={}, inserted={}, stored={}",
            post_id,
            fetched_count,
            inserted,
            comments.len()
        );

        Ok(PipelineRun { inserted, comments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;
    use std::cell::RefCell;

    /// Serves a fixed thread, or fails when `fail` is set
    struct FakeSource {
        comments: RefCell<Vec<FetchedComment>>,
        fail: bool,
    }

    impl FakeSource {
        fn new(comments: Vec<FetchedComment>) -> Self {
            Self {
                comments: RefCell::new(comments),
                fail: false,
            }
        }
    }

    impl CommentSource for FakeSource {
        fn fetch(&self, _post_id: &str) -> Result<Vec<FetchedComment>, ClientError> {
            if self.fail {
                return Err(ClientError::Network("connection reset".into()));
            }
            Ok(self.comments.borrow().clone())
        }
    }

    fn fetched(native_id: &str, body: &str, score: i64, created_utc: &str) -> FetchedComment {
        FetchedComment::new(
            native_id,
            "abc123",
            body.to_string(),
            score,
            created_utc.to_string(),
        )
    }

    #[test]
    fn test_run_scores_stores_and_reloads() {
        let db = CacheDb::open_in_memory().unwrap();
        let scorer = LexiconScorer::new();
        let source = FakeSource::new(vec![
            fetched("c1", "great answer", 10, "2024-03-01T10:05:00"),
            fetched("c2", "terrible idea", -3, "2024-03-01T10:47:00"),
            fetched("c3", "posted from my phone", 1, "2024-03-01T11:10:00"),
        ]);

        let run = CommentPipeline::new(&source, &scorer, &db).run("abc123").unwrap();

        assert_eq!(run.inserted, 3);
        let labels: Vec<SentimentLabel> = run.comments.iter().map(|c| c.sentiment_label).collect();
        assert_eq!(
            labels,
            vec![
                SentimentLabel::Neutral,
                SentimentLabel::Negative,
                SentimentLabel::Positive
            ]
        );
    }

    #[test]
    fn test_refetch_inserts_only_new_comments() {
        let db = CacheDb::open_in_memory().unwrap();
        let scorer = LexiconScorer::new();
        let source = FakeSource::new(vec![fetched("c1", "good", 1, "2024-03-01T10:05:00")]);

        let first = CommentPipeline::new(&source, &scorer, &db).run("abc123").unwrap();
        assert_eq!(first.inserted, 1);

        source.comments.borrow_mut()[0].score = 50;
        source
            .comments
            .borrow_mut()
            .push(fetched("c2", "bad", 0, "2024-03-01T12:00:00"));

        let second = CommentPipeline::new(&source, &scorer, &db).run("abc123").unwrap();
        assert_eq!(second.inserted, 1);
        assert_eq!(second.comments.len(), 2);
        // first write wins
        assert_eq!(second.comments[1].score, 1);
    }

    #[test]
    fn test_empty_thread_completes() {
        let db = CacheDb::open_in_memory().unwrap();
        let scorer = LexiconScorer::new();
        let source = FakeSource::new(Vec::new());

        let run = CommentPipeline::new(&source, &scorer, &db).run("abc123").unwrap();
        assert_eq!(run.inserted, 0);
        assert!(run.comments.is_empty());
    }

    #[test]
    fn test_fetch_failure_is_fatal_to_the_run() {
        let db = CacheDb::open_in_memory().unwrap();
        let scorer = LexiconScorer::new();
        let mut source = FakeSource::new(Vec::new());
        source.fail = true;

        let err = CommentPipeline::new(&source, &scorer, &db)
            .run("abc123")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(ClientError::Network(_))));
    }
}
