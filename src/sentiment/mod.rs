// SPDX-License-Identifier: MPL-2.0

mod lexicon;

pub use lexicon::LexiconScorer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maps comment text to a polarity in `[-1.0, 1.0]`.
pub trait Scorer {
    fn polarity(&self, text: &str) -> f64;
}

/// Three-way classification derived from a polarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    /// Strictly positive is Positive, strictly negative is Negative,
    /// everything else (zero, NaN) is Neutral.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            Self::Positive
        } else if polarity < 0.0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sentiment label: {}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for SentimentLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positive" => Ok(Self::Positive),
            "Negative" => Ok(Self::Negative),
            "Neutral" => Ok(Self::Neutral),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}
