//! Classification records and their sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary text a model writes when its tool returned nothing
pub const EMPTY_SENTINEL: &str = "empty";

/// Lowest sentiment score
pub const SENTIMENT_MIN: f64 = 0.0;

/// Highest sentiment score
pub const SENTIMENT_MAX: f64 = 5.0;

/// Where a record's evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Financial news search
    Financial,
    /// Social media search
    Social,
}

impl Source {
    /// Both sources, in display order
    pub const ALL: [Source; 2] = [Source::Financial, Source::Social];

    /// Section heading
    pub fn heading(self) -> &'static str {
        match self {
            Self::Financial => "Financial News Analysis",
            Self::Social => "Social Analysis",
        }
    }

    /// Message shown in place of a degenerate summary
    pub fn no_data_message(self) -> &'static str {
        match self {
            Self::Financial => "No financial news was retrieved for the ticker.",
            Self::Social => "No social info was retrieved for the ticker.",
        }
    }

    /// Message shown when the pipeline failed
    pub fn unavailable_message(self) -> &'static str {
        match self {
            Self::Financial => "Financial news analysis is unavailable right now.",
            Self::Social => "Social media analysis is unavailable right now.",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Financial => f.write_str("financial"),
            Self::Social => f.write_str("social"),
        }
    }
}

/// Structured result of one extraction: the query used, a sentiment score and a summary
///
/// Records are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    query: String,
    sentiment: Option<f64>,
    summary: String,
}

impl ClassificationRecord {
    /// Create a record
    pub fn new(
        query: impl Into<String>,
        sentiment: Option<f64>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            sentiment,
            summary: summary.into(),
        }
    }

    /// The literal query the tool was invoked with
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Sentiment in `[0.0, 5.0]`, if the model gave one
    pub fn sentiment(&self) -> Option<f64> {
        self.sentiment
    }

    /// Summary text, possibly the `"empty"` sentinel
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Whether the record carries no usable summary
    ///
    /// True when the summary is empty or contains `"empty"` anywhere (case-sensitive).
    pub fn is_degenerate(&self) -> bool {
        self.summary.is_empty() || self.summary.contains(EMPTY_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_detection() {
        assert!(ClassificationRecord::new("q", None, "").is_degenerate());
        assert!(ClassificationRecord::new("q", None, "empty").is_degenerate());
        assert!(ClassificationRecord::new("q", Some(2.5), "The reply was empty.").is_degenerate());
        // case-sensitive
        assert!(!ClassificationRecord::new("q", Some(2.5), "Empty shelves").is_degenerate());
        assert!(!ClassificationRecord::new("q", Some(4.0), "Strong earnings").is_degenerate());
    }

    #[test]
    fn test_accessors() {
        let record = ClassificationRecord::new("EQNR OR Equinor ASA", Some(3.0), "Mixed views");
        assert_eq!(record.query(), "EQNR OR Equinor ASA");
        assert_eq!(record.sentiment(), Some(3.0));
        assert_eq!(record.summary(), "Mixed views");
    }

    #[test]
    fn test_source_messages() {
        assert_eq!(Source::Financial.heading(), "Financial News Analysis");
        assert_eq!(Source::Social.heading(), "Social Analysis");
        assert_eq!(
            Source::Social.no_data_message(),
            "No social info was retrieved for the ticker."
        );
        assert_eq!(Source::Financial.to_string(), "financial");
    }
}
