//! Library module
//!
//! Listing, filtering and summarizing the capsules in the index.

mod listing;
mod models;

pub use listing::{list_capsules, summarize, time_ago};
pub use models::{CapsuleSummary, LibraryFilter, SortOrder};
