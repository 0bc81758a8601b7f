// SPDX-License-Identifier: MPL-2.0

//! Terminal and JSON rendering of a post's sentiment report.

use crate::cache::CommentRecord;
use crate::report::Report;
use crate::sentiment::SentimentLabel;
use crate::state::RefreshOutcome;
use serde::Serialize;
use std::fmt::Write;
use unicode_segmentation::UnicodeSegmentation;

const BAR_WIDTH: usize = 40;
const BODY_WIDTH: usize = 60;
const HOUR_FORMAT: &str = "%Y-%m-%d %H:00";

/// Everything one render shows
#[derive(Debug, Serialize)]
pub struct Dashboard<'a> {
    pub post_id: &'a str,
    pub new_this_round: usize,
    /// Set when the refresh failed and an older view is shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_error: Option<&'a str>,
    pub report: Report,
    pub comments: &'a [CommentRecord],
}

impl<'a> Dashboard<'a> {
    pub fn new(
        post_id: &'a str,
        comments: &'a [CommentRecord],
        outcome: &'a RefreshOutcome,
    ) -> Self {
        let (new_this_round, stale_error) = match outcome {
            RefreshOutcome::Refreshed { inserted } => (*inserted, None),
            RefreshOutcome::Cached => (0, None),
            RefreshOutcome::Stale { error } => (0, Some(error.as_str())),
        };

        Self {
            post_id,
            new_this_round,
            stale_error,
            report: Report::build(comments),
            comments,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        let report = &self.report;

        writeln!(out, "Post {}", self.post_id)?;
        writeln!(
            out,
            "Total stored comments: {} | New this round: {}",
            report.total, self.new_this_round
        )?;
        if let Some(error) = self.stale_error {
            writeln!(out, "Refresh failed, showing previous results: {}", error)?;
        }

        writeln!(out)?;
        writeln!(out, "Sentiment breakdown")?;
        let max = SentimentLabel::ALL
            .iter()
            .map(|l| report.labels.get(*l))
            .max()
            .unwrap_or(0);
        for label in SentimentLabel::ALL {
            let count = report.labels.get(label);
            writeln!(out, "  {:<9} {:>5} {}", label, count, bar(count, max))?;
        }

        writeln!(out)?;
        writeln!(out, "All comments")?;
        self.write_table(out, self.comments, true)?;

        writeln!(out)?;
        writeln!(out, "Sentiment over time (hourly mean)")?;
        for point in &report.sentiment_trend {
            match point.mean_sentiment {
                Some(mean) => writeln!(out, "  {}  {:+.3}", point.hour.format(HOUR_FORMAT), mean)?,
                None => writeln!(out, "  {}  n/a", point.hour.format(HOUR_FORMAT))?,
            }
        }

        writeln!(out)?;
        writeln!(out, "Comment volume over time (hourly)")?;
        let max = report.volume_trend.iter().map(|p| p.count).max().unwrap_or(0);
        for point in &report.volume_trend {
            writeln!(
                out,
                "  {}  {:>5} {}",
                point.hour.format(HOUR_FORMAT),
                point.count,
                bar(point.count, max)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Potential toxic comments (negative & downvoted)")?;
        writeln!(out, "Found {} potentially toxic comments:", report.toxic.len())?;
        self.write_table(out, &report.toxic, false)?;

        Ok(())
    }

    fn write_table(
        &self,
        out: &mut String,
        rows: &[CommentRecord],
        with_label: bool,
    ) -> std::fmt::Result {
        if rows.is_empty() {
            return writeln!(out, "  (none)");
        }

        for row in rows {
            let label = if with_label {
                format!("{:<9} ", row.sentiment_label.as_str())
            } else {
                String::new()
            };
            writeln!(
                out,
                "  {:<19}  {:>6}  {:+.3}  {}{}",
                row.created_utc,
                row.score,
                row.sentiment,
                label,
                truncate(&row.body, BODY_WIDTH)
            )?;
        }
        Ok(())
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(width)
}

/// Single-line preview, cut on grapheme boundaries
fn truncate(body: &str, width: usize) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let graphemes: Vec<&str> = flat.graphemes(true).collect();

    if graphemes.len() <= width {
        return flat;
    }
    let mut cut: String = graphemes[..width.saturating_sub(3)].concat();
    cut.push_str("...");
    cut
}
