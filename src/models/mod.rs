//! Data models for the harvesting pipeline.

mod job;
mod run;
mod source;

pub use job::{JobPosting, RawListing};
pub use run::{FaultKind, RunStatus, RunSummary, ScrapeFault, ScrapeRun};
pub use source::{PaginationConfig, SelectorMap, SourceConfig};
