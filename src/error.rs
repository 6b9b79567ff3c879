//! Error types for template loading, document acquisition and extraction

use thiserror::Error;

/// Everything that can go wrong while loading a template, fetching a document
/// or running a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A filter `type` that no filter implements.
    #[error("unknown filter {0:?}")]
    UnknownFilter(String),

    /// Structurally invalid template document.
    #[error("invalid template: {0}")]
    Template(String),

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A filter received a value of the wrong shape. Indicates a filter chain
    /// that does not line up with the data flowing through it.
    #[error("filter {filter:?} expects {expected}, got {found}")]
    FilterType {
        filter: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot parse {input:?} with layout {layout:?}: {reason}")]
    ParseDate {
        input: String,
        layout: String,
        reason: String,
    },

    #[error("invalid url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// Result does not fit the requested type
    #[error("cannot decode scrape result: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ScrapeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template needs fixing; retrying will not help.
    Configuration,
    /// The document could not be fetched or read.
    Acquisition,
    /// Filter chain and data flow disagree about value shapes.
    FilterType,
    /// The document content did not fit a filter (bad date, bad URL), or the
    /// result did not fit the requested type.
    Data,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownFilter(_)
            | Self::Template(_)
            | Self::InvalidSelector { .. }
            | Self::InvalidPattern { .. } => ErrorKind::Configuration,
            Self::Fetch { .. } | Self::Io(_) => ErrorKind::Acquisition,
            Self::FilterType { .. } => ErrorKind::FilterType,
            Self::ParseDate { .. } | Self::InvalidUrl { .. } | Self::Decode(_) => ErrorKind::Data,
        }
    }

    /// Defects in the template itself that must not be hidden by the
    /// per-item isolation of `Each`.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::FilterType { .. } | Self::InvalidSelector { .. } | Self::InvalidPattern { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
