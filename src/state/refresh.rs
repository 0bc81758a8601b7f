// SPDX-License-Identifier: MPL-2.0

//! Interval-gated re-runs of the comment pipeline.
//!
//! A render either serves the cached view for its (session, post) pair or,
//! once the refresh interval has passed, runs the whole pipeline again.

use crate::cache::CommentRecord;
use crate::pipeline::{Pipeline, PipelineError};
use crate::reddit::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Minimum seconds between automatic re-fetches of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RefreshInterval(u64);

impl RefreshInterval {
    pub const MIN: u64 = 30;
    pub const MAX: u64 = 300;
    pub const DEFAULT: u64 = 60;

    /// `None` outside `[MIN, MAX]`
    pub fn new(secs: u64) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&secs).then_some(Self(secs))
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u64> for RefreshInterval {
    type Error = String;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::new(secs).ok_or_else(|| {
            format!(
                "refresh interval must be within {}..={} seconds, got {}",
                Self::MIN,
                Self::MAX,
                secs
            )
        })
    }
}

impl From<RefreshInterval> for u64 {
    fn from(interval: RefreshInterval) -> Self {
        interval.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    session: String,
    post_id: String,
}

/// Last loaded view of a post
#[derive(Debug, Clone)]
struct CachedView {
    comments: Vec<CommentRecord>,
    last_run: Instant,
}

/// Caller-owned cache of views, keyed by session and post.
/// Entries live until the context is dropped.
#[derive(Debug, Default)]
pub struct RefreshContext {
    views: HashMap<ViewKey, CachedView>,
}

impl RefreshContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the pipeline last succeeded for this pair
    #[allow(dead_code)]
    pub fn last_run(&self, session: &str, post_id: &str) -> Option<Instant> {
        self.views.get(&key(session, post_id)).map(|v| v.last_run)
    }
}

fn key(session: &str, post_id: &str) -> ViewKey {
    ViewKey {
        session: session.to_string(),
        post_id: post_id.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The pipeline ran and `inserted` rows were new
    Refreshed { inserted: usize },
    /// Still within the interval; nothing was fetched
    Cached,
    /// The pipeline failed; the previous view is served and the next render retries
    Stale { error: String },
}

/// What a render should display
#[derive(Debug)]
pub struct RenderedView<'c> {
    pub comments: &'c [CommentRecord],
    pub outcome: RefreshOutcome,
}

impl RenderedView<'_> {
    /// New rows in this render; zero unless the pipeline just ran
    pub fn new_this_round(&self) -> usize {
        match self.outcome {
            RefreshOutcome::Refreshed { inserted } => inserted,
            _ => 0,
        }
    }
}

pub struct RefreshController<P: Pipeline> {
    pipeline: P,
    interval: RefreshInterval,
}

impl<P: Pipeline> RefreshController<P> {
    pub fn new(pipeline: P, interval: RefreshInterval) -> Self {
        Self { pipeline, interval }
    }

    fn is_due(&self, view: Option<&CachedView>, now: Instant) -> bool {
        match view {
            None => true,
            Some(view) => now.saturating_duration_since(view.last_run) > self.interval.as_duration(),
        }
    }

    /// Serve the view for `post_id`, running the pipeline first when due.
    ///
    /// A failed run with no earlier view propagates the error. A failed run
    /// with an earlier view serves it as stale and keeps its timestamp, so
    /// the next render retries. Rate limiting is the exception: it restarts
    /// the interval.
    pub fn render<'c>(
        &mut self,
        ctx: &'c mut RefreshContext,
        session: &str,
        post_id: &str,
        now: Instant,
    ) -> Result<RenderedView<'c>, PipelineError> {
        let key = key(session, post_id);

        if !self.is_due(ctx.views.get(&key), now) {
            debug!("Serving cached view - session={}, post={}", session, post_id);
            let view = &ctx.views[&key];
            return Ok(RenderedView {
                comments: &view.comments,
                outcome: RefreshOutcome::Cached,
            });
        }

        match self.pipeline.run(post_id) {
            Ok(run) => {
                let inserted = run.inserted;
                let view = ctx.views.entry(key).or_insert_with(|| CachedView {
                    comments: Vec::new(),
                    last_run: now,
                });
                view.comments = run.comments;
                view.last_run = now;

                Ok(RenderedView {
                    comments: &view.comments,
                    outcome: RefreshOutcome::Refreshed { inserted },
                })
            }
            Err(e) => match ctx.views.get_mut(&key) {
                Some(view) => {
                    warn!(
                        "Refresh failed, serving previous view - post={}, error={}",
                        post_id, e
                    );
                    // Back off a full interval instead of retrying every render
                    if matches!(e, PipelineError::Fetch(ClientError::RateLimited)) {
                        view.last_run = now;
                    }
                    Ok(RenderedView {
                        comments: &view.comments,
                        outcome: RefreshOutcome::Stale {
                            error: e.to_string(),
                        },
                    })
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineRun;
    use crate::sentiment::SentimentLabel;

    /// Counts runs; each run adds one comment to the "stored" thread
    #[derive(Default)]
    struct CountingPipeline {
        runs: usize,
        fail_next: Option<ClientError>,
        stored: Vec<CommentRecord>,
    }

    impl Pipeline for CountingPipeline {
        fn run(&mut self, post_id: &str) -> Result<PipelineRun, PipelineError> {
            if let Some(e) = self.fail_next.take() {
                return Err(e.into());
            }
            self.runs += 1;
            self.stored.insert(
                0,
                CommentRecord {
                    id: format!("c{}", self.runs),
                    post_id: post_id.to_string(),
                    body: String::new(),
                    score: 0,
                    created_utc: format!("2024-03-01T10:{:02}:00", self.runs),
                    sentiment: 0.0,
                    sentiment_label: SentimentLabel::Neutral,
                },
            );
            Ok(PipelineRun {
                inserted: 1,
                comments: self.stored.clone(),
            })
        }
    }

    fn controller(secs: u64) -> RefreshController<CountingPipeline> {
        RefreshController::new(
            CountingPipeline::default(),
            RefreshInterval::new(secs).unwrap(),
        )
    }

    #[test]
    fn test_interval_bounds() {
        assert!(RefreshInterval::new(29).is_none());
        assert!(RefreshInterval::new(301).is_none());
        assert_eq!(RefreshInterval::new(30).unwrap().secs(), 30);
        assert_eq!(RefreshInterval::new(300).unwrap().secs(), 300);
        assert_eq!(RefreshInterval::default().secs(), 60);
    }

    #[test]
    fn test_first_render_runs_pipeline() {
        let mut ctrl = controller(60);
        let mut ctx = RefreshContext::new();
        let now = Instant::now();

        let view = ctrl.render(&mut ctx, "s1", "abc123", now).unwrap();
        assert_eq!(view.outcome, RefreshOutcome::Refreshed { inserted: 1 });
        assert_eq!(view.new_this_round(), 1);
        assert_eq!(view.comments.len(), 1);
        assert_eq!(ctrl.pipeline.runs, 1);
        assert_eq!(ctx.last_run("s1", "abc123"), Some(now));
    }

    #[test]
    fn test_render_within_interval_serves_cache() {
        let mut ctrl = controller(60);
        let mut ctx = RefreshContext::new();
        let t0 = Instant::now();

        let first: Vec<CommentRecord> = ctrl
            .render(&mut ctx, "s1", "abc123", t0)
            .unwrap()
            .comments
            .to_vec();

        let view = ctrl
            .render(&mut ctx, "s1", "abc123", t0 + Duration::from_secs(60))
            .unwrap();
        assert_eq!(view.outcome, RefreshOutcome::Cached);
        assert_eq!(view.new_this_round(), 0);
        assert_eq!(view.comments, first.as_slice());
        assert_eq!(ctrl.pipeline.runs, 1);
        assert_eq!(ctx.last_run("s1", "abc123"), Some(t0));
    }

    #[test]
    fn test_render_after_interval_reruns() {
        let mut ctrl = controller(30);
        let mut ctx = RefreshContext::new();
        let t0 = Instant::now();

        ctrl.render(&mut ctx, "s1", "abc123", t0).unwrap();
        let later = t0 + Duration::from_secs(31);
        let view = ctrl.render(&mut ctx, "s1", "abc123", later).unwrap();

        assert_eq!(view.outcome, RefreshOutcome::Refreshed { inserted: 1 });
        assert_eq!(view.comments.len(), 2);
        assert_eq!(ctrl.pipeline.runs, 2);
        assert_eq!(ctx.last_run("s1", "abc123"), Some(later));
    }

    #[test]
    fn test_views_are_keyed_by_session_and_post() {
        let mut ctrl = controller(60);
        let mut ctx = RefreshContext::new();
        let t0 = Instant::now();

        ctrl.render(&mut ctx, "s1", "abc123", t0).unwrap();
        ctrl.render(&mut ctx, "s2", "abc123", t0).unwrap();
        ctrl.render(&mut ctx, "s1", "def456", t0).unwrap();
        assert_eq!(ctrl.pipeline.runs, 3);

        ctrl.render(&mut ctx, "s1", "abc123", t0 + Duration::from_secs(5))
            .unwrap();
        assert_eq!(ctrl.pipeline.runs, 3);
    }

    #[test]
    fn test_failure_without_cache_propagates() {
        let mut ctrl = controller(60);
        ctrl.pipeline.fail_next = Some(ClientError::RateLimited);
        let mut ctx = RefreshContext::new();

        let err = ctrl
            .render(&mut ctx, "s1", "abc123", Instant::now())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(ClientError::RateLimited)));
        assert_eq!(ctx.last_run("s1", "abc123"), None);
    }

    #[test]
    fn test_failure_with_cache_serves_stale_and_retries() {
        let mut ctrl = controller(30);
        let mut ctx = RefreshContext::new();
        let t0 = Instant::now();

        ctrl.render(&mut ctx, "s1", "abc123", t0).unwrap();

        ctrl.pipeline.fail_next = Some(ClientError::Network("connection reset".into()));
        let t1 = t0 + Duration::from_secs(45);
        let view = ctrl.render(&mut ctx, "s1", "abc123", t1).unwrap();
        assert!(matches!(view.outcome, RefreshOutcome::Stale { .. }));
        assert_eq!(view.comments.len(), 1);
        assert_eq!(ctx.last_run("s1", "abc123"), Some(t0));

        // timestamp was not advanced, so the very next render retries
        let view = ctrl
            .render(&mut ctx, "s1", "abc123", t1 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(view.outcome, RefreshOutcome::Refreshed { inserted: 1 });
        assert_eq!(ctrl.pipeline.runs, 2);
    }

    #[test]
    fn test_rate_limit_waits_a_full_interval() {
        let mut ctrl = controller(30);
        let mut ctx = RefreshContext::new();
        let t0 = Instant::now();

        ctrl.render(&mut ctx, "s1", "abc123", t0).unwrap();

        ctrl.pipeline.fail_next = Some(ClientError::RateLimited);
        let t1 = t0 + Duration::from_secs(45);
        let view = ctrl.render(&mut ctx, "s1", "abc123", t1).unwrap();
        assert!(matches!(view.outcome, RefreshOutcome::Stale { .. }));
        assert_eq!(ctx.last_run("s1", "abc123"), Some(t1));

        let view = ctrl
            .render(&mut ctx, "s1", "abc123", t1 + Duration::from_secs(10))
            .unwrap();
        assert_eq!(view.outcome, RefreshOutcome::Cached);
        assert_eq!(view.comments.len(), 1);
        assert_eq!(ctrl.pipeline.runs, 1);

        let view = ctrl
            .render(&mut ctx, "s1", "abc123", t1 + Duration::from_secs(31))
            .unwrap();
        assert_eq!(view.outcome, RefreshOutcome::Refreshed { inserted: 1 });
        assert_eq!(ctrl.pipeline.runs, 2);
    }
}
