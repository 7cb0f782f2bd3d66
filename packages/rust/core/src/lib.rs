//! Pipeline orchestration for teamscrape.
//!
//! Ties the seed source, page resolver and team-page extractor together
//! over a checkpoint store, then consolidates the results.

pub mod consolidate;
pub mod extract;
pub mod pipeline;
pub mod resolve;

#[cfg(test)]
mod testing;

pub use consolidate::{consolidate, run_consolidation, write_consolidated};
pub use extract::{ExtractOutcome, ExtractionSummary, extract_members, extract_one};
pub use pipeline::{
    Collaborators, PipelineReport, ProgressReporter, SilentProgress, load_or_discover_seeds,
    run_pipeline,
};
pub use resolve::{load_or_resolve_pages, resolve_pages};
