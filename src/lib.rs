//! Greedy filter search over historical wager records.
//!
//! Load a CSV export, narrow it to a scope, then repeatedly commit the single
//! filter adjustment that most improves ROI until no adjustment helps.

pub mod candidates;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod logging;
pub mod report;
pub mod roi;
pub mod scope;
pub mod score;
pub mod search;
pub mod stage;
pub mod storage;
pub mod synth;

pub use config::{SearchParams, SearchSettings};
pub use dataset::Dataset;
pub use error::{SearchError, SearchResult};
pub use scope::{run_analysis, Scope};
pub use search::{search, SearchOutcome, Termination};
