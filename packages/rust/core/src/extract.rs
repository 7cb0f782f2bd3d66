//! Stage 3: resolved page → per-page member artifact.
//!
//! Each distinct non-empty link is one unit of work keyed by
//! [`members_key`]. A unit runs only when its artifact is absent; the
//! existence check, extraction and write all happen under the key's lock.
//! Failures and timeouts persist an empty artifact so they are not retried.

use std::collections::HashSet;
use std::sync::Arc;

use teamscrape_crawler::TeamPageExtractor;
use teamscrape_shared::{PersonRecord, ResolvedPage, Result, RunConfig, TeamScrapeError};
use teamscrape_storage::{CheckpointStore, members_key};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::pipeline::ProgressReporter;

/// Outcome of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Artifact written with this many records.
    Written(usize),
    /// Extraction failed or timed out; an empty artifact was written.
    Failed,
    /// Artifact already existed.
    Skipped,
}

/// Counts for the extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: usize,
}

/// Ensure a member artifact exists for every resolved page.
///
/// Infrastructure errors (store writes, aborted tasks) do not cancel other
/// units; the first one is returned after every unit has finished.
#[instrument(skip_all, fields(pages = pages.len(), concurrency = config.concurrency))]
pub async fn extract_members(
    store: Arc<CheckpointStore>,
    pages: &[ResolvedPage],
    extractor: Arc<dyn TeamPageExtractor>,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<ExtractionSummary> {
    let mut seen = HashSet::new();
    let links: Vec<String> = pages
        .iter()
        .filter(|p| p.is_resolved())
        .filter(|p| seen.insert(p.link.clone()))
        .map(|p| p.link.clone())
        .collect();

    let total = links.len();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let timeout = config.call_timeout;

    let mut handles = Vec::with_capacity(total);
    for link in links.iter().cloned() {
        let store = Arc::clone(&store);
        let extractor = Arc::clone(&extractor);
        let sem = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| TeamScrapeError::validation(format!("worker pool closed: {e}")))?;
            extract_one(&store, extractor.as_ref(), &link, timeout).await
        }));
    }

    let mut summary = ExtractionSummary::default();
    let mut first_error = None;

    for (i, (link, handle)) in links.iter().zip(handles).enumerate() {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(TeamScrapeError::Extraction(format!("{link}: task aborted: {e}"))),
        };
        match outcome {
            Ok(ExtractOutcome::Written(n)) => {
                summary.written += 1;
                summary.records += n;
            }
            Ok(ExtractOutcome::Failed) => {
                summary.written += 1;
                summary.failed += 1;
            }
            Ok(ExtractOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                error!(%link, error = %e, "extraction unit failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        progress.item(i + 1, total, link);
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(
        written = summary.written,
        skipped = summary.skipped,
        failed = summary.failed,
        records = summary.records,
        "member extraction complete"
    );
    Ok(summary)
}

/// Run one unit of work under its key lock.
pub async fn extract_one(
    store: &CheckpointStore,
    extractor: &dyn TeamPageExtractor,
    link: &str,
    timeout: std::time::Duration,
) -> Result<ExtractOutcome> {
    if link.is_empty() {
        return Err(TeamScrapeError::validation("cannot extract an empty link"));
    }

    let key = members_key(link);
    let _guard = store.lock(&key).await;

    if store.exists(&key) {
        debug!(%link, %key, "artifact exists, skipping");
        return Ok(ExtractOutcome::Skipped);
    }

    let (records, outcome) = match tokio::time::timeout(timeout, extractor.extract(link)).await {
        Ok(Ok(members)) => {
            let records: Vec<PersonRecord> = members
                .into_iter()
                .map(|m| PersonRecord::from_member(link, m))
                .collect();
            let n = records.len();
            (records, ExtractOutcome::Written(n))
        }
        Ok(Err(e)) => {
            warn!(%link, error = %e, "extraction failed, recording empty result");
            (Vec::new(), ExtractOutcome::Failed)
        }
        Err(_) => {
            warn!(%link, timeout_ms = timeout.as_millis() as u64, "extraction timed out, recording empty result");
            (Vec::new(), ExtractOutcome::Failed)
        }
    };

    store.save_members(&key, &records)?;
    debug!(%link, %key, records = records.len(), "artifact written");
    Ok(outcome)
}
