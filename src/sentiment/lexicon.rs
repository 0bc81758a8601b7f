// SPDX-License-Identifier: MPL-2.0

//! Lexicon-based polarity scoring.
//!
//! Every word found in the lexicon contributes its prior polarity, scaled by a
//! preceding intensifier and flipped by a preceding negator. The comment's
//! polarity is the mean of those contributions.

use super::Scorer;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

/// Multiplier applied to a word preceded by "not", "never", ...
const NEGATION_FACTOR: f64 = -0.5;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>\[\]\{}|\\^`\x00-\x1f\x7f]+").unwrap());

static LEXICON: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        // positive
        ("good", 0.7),
        ("great", 0.8),
        ("excellent", 1.0),
        ("amazing", 0.6),
        ("awesome", 1.0),
        ("wonderful", 1.0),
        ("fantastic", 0.4),
        ("brilliant", 0.9),
        ("perfect", 1.0),
        ("best", 1.0),
        ("better", 0.5),
        ("nice", 0.6),
        ("love", 0.5),
        ("loved", 0.7),
        ("lovely", 0.5),
        ("like", 0.2),
        ("happy", 0.8),
        ("glad", 0.5),
        ("fun", 0.3),
        ("funny", 0.25),
        ("cool", 0.35),
        ("beautiful", 0.85),
        ("interesting", 0.5),
        ("helpful", 0.5),
        ("useful", 0.3),
        ("thanks", 0.2),
        ("thank", 0.2),
        ("agree", 0.2),
        ("right", 0.29),
        ("correct", 0.3),
        ("impressive", 1.0),
        ("enjoy", 0.4),
        ("enjoyed", 0.4),
        ("fair", 0.7),
        ("win", 0.8),
        ("wholesome", 0.6),
        ("lol", 0.8),
        ("haha", 0.2),
        // negative
        ("bad", -0.7),
        ("worse", -0.4),
        ("worst", -1.0),
        ("terrible", -1.0),
        ("awful", -1.0),
        ("horrible", -1.0),
        ("disgusting", -1.0),
        ("pathetic", -1.0),
        ("poor", -0.4),
        ("hate", -0.8),
        ("hated", -0.9),
        ("sad", -0.5),
        ("angry", -0.5),
        ("annoying", -0.8),
        ("boring", -1.0),
        ("stupid", -0.8),
        ("dumb", -0.375),
        ("idiot", -0.8),
        ("useless", -0.5),
        ("wrong", -0.5),
        ("fail", -0.5),
        ("failed", -0.5),
        ("broken", -0.4),
        ("ugly", -0.7),
        ("disappointing", -0.6),
        ("disappointed", -0.75),
        ("ridiculous", -0.33),
        ("trash", -0.6),
        ("garbage", -0.6),
        ("scam", -0.7),
        ("toxic", -0.6),
        ("nasty", -1.0),
        ("evil", -1.0),
        ("shame", -0.3),
        ("sucks", -0.3),
        ("crap", -0.8),
        ("mess", -0.4),
    ]
    .into_iter()
    .collect()
});

static INTENSIFIERS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        ("very", 1.3),
        ("really", 1.3),
        ("extremely", 1.5),
        ("incredibly", 1.5),
        ("super", 1.3),
        ("so", 1.2),
        ("totally", 1.3),
        ("absolutely", 1.5),
        ("pretty", 1.1),
        ("somewhat", 0.8),
        ("slightly", 0.6),
        ("kinda", 0.8),
    ]
    .into_iter()
    .collect()
});

const NEGATORS: &[&str] = &["not", "no", "never", "nothing", "neither", "nor", "hardly"];

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

/// Default scorer backed by a built-in English word list
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    fn tokenize(text: &str) -> Vec<String> {
        let without_links = URL_RE.replace_all(text, " ");
        without_links
            .unicode_words()
            .map(|w| w.to_lowercase().replace('\u{2019}', "'"))
            .collect()
    }
}

impl Scorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let words = Self::tokenize(text);
        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&prior) = LEXICON.get(word.as_str()) else {
                continue;
            };

            let mut value = prior;
            let mut lookback = i;

            // "very good", "not very good"
            if lookback > 0 {
                if let Some(&m) = INTENSIFIERS.get(words[lookback - 1].as_str()) {
                    value *= m;
                    lookback -= 1;
                }
            }
            if lookback > 0 && is_negator(&words[lookback - 1]) {
                value *= NEGATION_FACTOR;
            }

            total += value;
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(-1.0, 1.0)
    }
}
