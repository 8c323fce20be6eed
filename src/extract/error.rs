//! Extraction error types.

use thiserror::Error;

/// Page-level extraction failure. The page contributes no records.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The list-name marker is missing: blocked, error or unrendered page.
    #[error("list-name-not-found")]
    ListNameNotFound,

    /// A malformed item aborted the page under the strict item policy.
    #[error("item #{rank} ({item_id}) is malformed: {source}")]
    MalformedItem {
        rank: u32,
        item_id: String,
        #[source]
        source: ItemError,
    },
}

/// Why a single item container could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("missing item name link")]
    MissingName,

    #[error("item name link has no title attribute")]
    MissingTitle,

    #[error("missing {0} count element")]
    MissingCount(&'static str),

    #[error("invalid {field} count {value:?}")]
    InvalidCount { field: &'static str, value: String },

    #[error("invalid price {0:?}")]
    InvalidPrice(String),
}
