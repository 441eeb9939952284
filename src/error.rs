//! Error taxonomy for loading, scoping and searching.

use thiserror::Error;

use crate::candidates::Category;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("no rows left after the initial filters")]
    EmptyDataset,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid search configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("candidate generation failed for {category}: {reason}")]
    Candidate { category: Category, reason: String },
}

pub type SearchResult<T> = Result<T, SearchError>;
