// SPDX-License-Identifier: MPL-2.0

//! Summary views over the stored comments of one post.
//!
//! Everything is recomputed from the full record set on every call.

use crate::cache::CommentRecord;
use crate::sentiment::SentimentLabel;
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Comments below this polarity are candidates for the toxicity filter
pub const TOXIC_SENTIMENT_BELOW: f64 = -0.5;
/// ...as long as their net score is also below this
pub const TOXIC_SCORE_BELOW: i64 = 1;

/// Count of comments per sentiment label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelHistogram {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelHistogram {
    pub fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    pub fn get(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Mean sentiment for one hour. `None` for hours without comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentPoint {
    pub hour: NaiveDateTime,
    pub mean_sentiment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumePoint {
    pub hour: NaiveDateTime,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total: usize,
    pub labels: LabelHistogram,
    pub sentiment_trend: Vec<SentimentPoint>,
    pub volume_trend: Vec<VolumePoint>,
    pub toxic: Vec<CommentRecord>,
}

impl Report {
    pub fn build(records: &[CommentRecord]) -> Self {
        let mut labels = LabelHistogram::default();
        for record in records {
            labels.add(record.sentiment_label);
        }

        let (sentiment_trend, volume_trend) = hourly_trends(records);

        Self {
            total: records.len(),
            labels,
            sentiment_trend,
            volume_trend,
            toxic: toxic_comments(records),
        }
    }
}

pub fn is_toxic(record: &CommentRecord) -> bool {
    record.sentiment < TOXIC_SENTIMENT_BELOW && record.score < TOXIC_SCORE_BELOW
}

/// Strongly negative and not net-upvoted, in input order
pub fn toxic_comments(records: &[CommentRecord]) -> Vec<CommentRecord> {
    records.iter().filter(|r| is_toxic(r)).cloned().collect()
}

fn floor_to_hour(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    dt.date().and_hms_opt(dt.hour(), 0, 0)
}

/// Hourly mean sentiment and volume, ascending by hour. Every hour between
/// the first and the last bucket is present.
pub fn hourly_trends(records: &[CommentRecord]) -> (Vec<SentimentPoint>, Vec<VolumePoint>) {
    // hour -> (sum, count)
    let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();

    for record in records {
        let Some(hour) = record
            .created_utc
            .parse::<NaiveDateTime>()
            .ok()
            .and_then(floor_to_hour)
        else {
            warn!(
                "Skipping comment with unparseable timestamp - id={}, created_utc={}",
                record.id, record.created_utc
            );
            continue;
        };

        let entry = buckets.entry(hour).or_insert((0.0, 0));
        entry.0 += record.sentiment;
        entry.1 += 1;
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return (Vec::new(), Vec::new());
    };

    let mut sentiment = Vec::new();
    let mut volume = Vec::new();
    let mut hour = first;

    while hour <= last {
        let (sum, count) = buckets.get(&hour).copied().unwrap_or((0.0, 0));
        sentiment.push(SentimentPoint {
            hour,
            mean_sentiment: (count > 0).then(|| sum / count as f64),
        });
        volume.push(VolumePoint { hour, count });
        hour += TimeDelta::hours(1);
    }

    (sentiment, volume)
}
