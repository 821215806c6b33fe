use thiserror::Error;

/// Why an analysis produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("hierarchy query returned no data: {reason}")]
    NoData { reason: String },

    #[error("entity {0} does not appear in the hierarchy")]
    EndpointNotFound(String),

    #[error("no path between {from} and {to}")]
    NoPath { from: String, to: String },

    #[error("row {row} has no `{column}` binding")]
    Malformed { row: usize, column: &'static str },
}

pub type Result<T> = std::result::Result<T, PathError>;
