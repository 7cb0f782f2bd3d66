//! End-to-end run: seeds → resolved pages → member artifacts → consolidated table.
//!
//! Every stage consults the checkpoint store first, so an interrupted run
//! resumes where it stopped and a finished run repeats no collaborator call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use teamscrape_crawler::{PageResolver, TeamPageExtractor};
use teamscrape_discovery::ContactSource;
use teamscrape_shared::{Result, RunConfig, SeedRecord};
use teamscrape_storage::CheckpointStore;
use tracing::{info, instrument};

use crate::consolidate::write_consolidated;
use crate::extract::extract_members;
use crate::resolve::load_or_resolve_pages;

/// The injected collaborators for one run.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ContactSource>,
    pub resolver: Arc<dyn PageResolver>,
    pub extractor: Arc<dyn TeamPageExtractor>,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Seeds loaded or discovered.
    pub seeds: usize,
    /// Resolved pages (one per unique seed).
    pub pages: usize,
    /// Pages with an empty link.
    pub unresolved: usize,
    /// Member artifacts written this run, including empty ones.
    pub artifacts_written: usize,
    /// Member artifacts already on disk.
    pub artifacts_skipped: usize,
    /// Extractions that failed or timed out this run.
    pub failed_extractions: usize,
    /// Rows in the consolidated table.
    pub rows: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each unit of work in the current phase finishes.
    fn item(&self, current: usize, total: usize, detail: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &PipelineReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _report: &PipelineReport) {}
}

/// Run all stages.
///
/// 1. Load `contacts_list.csv` or discover seeds and write it
/// 2. Load `pages_list.csv` or resolve every seed and write it
/// 3. Extract members for each resolved link without an artifact
/// 4. Write `final_team_members.csv`
#[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
pub async fn run_pipeline(
    store: Arc<CheckpointStore>,
    config: &RunConfig,
    collaborators: &Collaborators,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport> {
    let start = Instant::now();
    info!(concurrency = config.concurrency, "starting pipeline");

    // --- Stage 1: Seeds ---
    progress.phase("Loading seeds");
    let seeds = load_or_discover_seeds(&store, collaborators.source.as_ref()).await?;

    // --- Stage 2: Resolve ---
    progress.phase("Resolving team pages");
    let (pages, _) = load_or_resolve_pages(
        &store,
        &seeds,
        Arc::clone(&collaborators.resolver),
        config,
        progress,
    )
    .await?;

    // --- Stage 3: Extract ---
    progress.phase("Extracting team members");
    let summary = extract_members(
        Arc::clone(&store),
        &pages,
        Arc::clone(&collaborators.extractor),
        config,
        progress,
    )
    .await?;

    // --- Stage 4: Consolidate ---
    progress.phase("Consolidating");
    let rows = write_consolidated(&store, &pages)?;

    let report = PipelineReport {
        seeds: seeds.len(),
        pages: pages.len(),
        unresolved: pages.iter().filter(|p| !p.is_resolved()).count(),
        artifacts_written: summary.written,
        artifacts_skipped: summary.skipped,
        failed_extractions: summary.failed,
        rows: rows.len(),
        elapsed: start.elapsed(),
    };

    info!(
        seeds = report.seeds,
        pages = report.pages,
        rows = report.rows,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "pipeline complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Load the checkpointed seeds, or discover and persist them.
///
/// A corrupt seed file is an error, not a reason to rediscover.
pub async fn load_or_discover_seeds(
    store: &CheckpointStore,
    source: &dyn ContactSource,
) -> Result<Vec<SeedRecord>> {
    match store.load_seeds() {
        Ok(seeds) => {
            info!(count = seeds.len(), "using checkpointed seeds");
            Ok(seeds)
        }
        Err(e) if e.is_not_found() => {
            info!("no seed file, discovering");
            source.produce_csv(store).await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExtractor, FakeResolver, FakeSource, run_config, temp_store};
    use teamscrape_shared::{ConsolidatedRow, TeamMember};
    use teamscrape_storage::members_key;

    fn collaborators(
        source: &Arc<FakeSource>,
        resolver: &Arc<FakeResolver>,
        extractor: &Arc<FakeExtractor>,
    ) -> Collaborators {
        Collaborators {
            source: source.clone(),
            resolver: resolver.clone(),
            extractor: extractor.clone(),
        }
    }

    fn acme() -> (Arc<FakeSource>, Arc<FakeResolver>, Arc<FakeExtractor>) {
        let source = Arc::new(FakeSource::new(vec![SeedRecord::new(
            "Acme",
            "https://acme.example/contact",
            "NY",
        )]));
        let resolver = Arc::new(FakeResolver::new(&[(
            "https://acme.example/contact",
            "https://acme.example/team",
        )]));
        let extractor = Arc::new(FakeExtractor::new(&[(
            "https://acme.example/team",
            vec![TeamMember::new("Jane Doe", "Director")],
        )]));
        (source, resolver, extractor)
    }

    #[tokio::test]
    async fn acme_scenario() {
        let (dir, store) = temp_store();
        let (source, resolver, extractor) = acme();

        let report = run_pipeline(
            store.clone(),
            &run_config(&dir, 1),
            &collaborators(&source, &resolver, &extractor),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.seeds, 1);
        assert_eq!(report.rows, 1);
        assert_eq!(
            store.load_consolidated().unwrap(),
            vec![ConsolidatedRow {
                url: "https://acme.example/team".into(),
                name: "Jane Doe".into(),
                title: "Director".into(),
                company: "Acme".into(),
                location: "NY".into(),
            }]
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn second_run_makes_no_collaborator_calls() {
        let (dir, store) = temp_store();
        let (source, resolver, extractor) = acme();
        let config = run_config(&dir, 2);
        let collab = collaborators(&source, &resolver, &extractor);

        run_pipeline(store.clone(), &config, &collab, &SilentProgress)
            .await
            .unwrap();
        let first = store.read("final_team_members.csv").unwrap();
        let calls = (source.calls(), resolver.calls(), extractor.calls());
        assert_eq!(calls, (1, 1, 1));

        let report = run_pipeline(store.clone(), &config, &collab, &SilentProgress)
            .await
            .unwrap();
        let second = store.read("final_team_members.csv").unwrap();

        assert_eq!(first, second);
        assert_eq!((source.calls(), resolver.calls(), extractor.calls()), calls);
        assert_eq!(report.artifacts_written, 0);
        assert_eq!(report.artifacts_skipped, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn unresolved_seed_contributes_nothing() {
        let (dir, store) = temp_store();
        let source = Arc::new(FakeSource::new(vec![SeedRecord::new(
            "Ghost",
            "https://ghost.example/",
            "TX",
        )]));
        let resolver = Arc::new(FakeResolver::new(&[("https://ghost.example/", "")]));
        let extractor = Arc::new(FakeExtractor::new(&[]));

        let report = run_pipeline(
            store.clone(),
            &run_config(&dir, 1),
            &collaborators(&source, &resolver, &extractor),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.unresolved, 1);
        assert_eq!(report.rows, 0);
        assert_eq!(extractor.calls(), 0);
        assert!(store.list_member_keys().unwrap().is_empty());
        assert!(store.load_consolidated().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn deleted_artifact_is_the_retry_mechanism() {
        let (dir, store) = temp_store();
        let (source, resolver, extractor) = acme();
        let config = run_config(&dir, 1);
        let collab = collaborators(&source, &resolver, &extractor);

        run_pipeline(store.clone(), &config, &collab, &SilentProgress)
            .await
            .unwrap();
        assert!(store.remove(&members_key("https://acme.example/team")).unwrap());

        run_pipeline(store.clone(), &config, &collab, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(extractor.calls(), 2);
        assert_eq!(resolver.calls(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn existing_seed_file_skips_discovery() {
        let (dir, store) = temp_store();
        store
            .write(
                "contacts_list.csv",
                "Acme,https://acme.example/contact,NY\nAcme Again,https://acme.example/contact,NJ\n",
            )
            .unwrap();
        let source = Arc::new(FakeSource::new(Vec::new()));

        let seeds = load_or_discover_seeds(&store, source.as_ref()).await.unwrap();
        assert_eq!(source.calls(), 0);
        assert_eq!(seeds, vec![SeedRecord::new("Acme", "https://acme.example/contact", "NY")]);

        store.write("contacts_list.csv", "Acme,https://acme.example\n").unwrap();
        assert!(load_or_discover_seeds(&store, source.as_ref()).await.unwrap_err().is_parse());
        assert_eq!(source.calls(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
