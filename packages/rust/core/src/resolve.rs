//! Stage 2: seed → resolved page.
//!
//! The whole batch is checkpointed as one `pages_list.csv`, written after
//! every seed has been attempted. A failed or timed-out resolution is
//! recorded as an empty link.

use std::sync::Arc;

use teamscrape_crawler::PageResolver;
use teamscrape_shared::{ResolvedPage, Result, RunConfig, SeedRecord};
use teamscrape_storage::{CheckpointStore, dedupe_seeds};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::pipeline::ProgressReporter;

/// Load `pages_list.csv`, or resolve every seed and write it.
///
/// Returns the pages and whether the resolver ran.
#[instrument(skip_all, fields(seeds = seeds.len()))]
pub async fn load_or_resolve_pages(
    store: &CheckpointStore,
    seeds: &[SeedRecord],
    resolver: Arc<dyn PageResolver>,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<(Vec<ResolvedPage>, bool)> {
    match store.load_pages() {
        Ok(pages) => {
            info!(count = pages.len(), "using checkpointed page list");
            return Ok((pages, false));
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let pages = resolve_pages(seeds, resolver, config, progress).await;
    store.save_pages(&pages)?;
    Ok((pages, true))
}

/// Resolve each seed once, in seed order. Never fails: per-seed errors
/// become empty links.
pub async fn resolve_pages(
    seeds: &[SeedRecord],
    resolver: Arc<dyn PageResolver>,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Vec<ResolvedPage> {
    let seeds = dedupe_seeds(seeds.to_vec());
    let total = seeds.len();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let timeout = config.call_timeout;

    let mut handles = Vec::with_capacity(total);
    for seed in seeds.iter().cloned() {
        let resolver = Arc::clone(&resolver);
        let sem = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            if seed.url.trim().is_empty() {
                warn!(name = %seed.name, location = %seed.location, "seed has no directory url");
                return String::new();
            }
            let Ok(_permit) = sem.acquire_owned().await else {
                return String::new();
            };
            match tokio::time::timeout(timeout, resolver.resolve(&seed)).await {
                Ok(Ok(link)) => link.trim().to_string(),
                Ok(Err(e)) => {
                    warn!(url = %seed.url, error = %e, "resolution failed");
                    String::new()
                }
                Err(_) => {
                    warn!(url = %seed.url, timeout_ms = timeout.as_millis() as u64, "resolution timed out");
                    String::new()
                }
            }
        }));
    }

    let mut pages = Vec::with_capacity(total);
    for (i, (seed, handle)) in seeds.iter().zip(handles).enumerate() {
        let link = handle.await.unwrap_or_else(|e| {
            warn!(url = %seed.url, error = %e, "resolver task aborted");
            String::new()
        });
        progress.item(i + 1, total, &seed.url);
        pages.push(ResolvedPage::from_seed(seed, link));
    }

    let unresolved = pages.iter().filter(|p| !p.is_resolved()).count();
    info!(resolved = total - unresolved, unresolved, "page resolution complete");
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeResolver, run_config, temp_store};

    fn seed(url: &str) -> SeedRecord {
        SeedRecord::new("Org", url, "NY")
    }

    #[tokio::test]
    async fn failures_and_timeouts_become_empty_links() {
        let (dir, _store) = temp_store();
        let resolver = Arc::new(
            FakeResolver::new(&[
                ("https://a.example/", "https://a.example/team"),
                ("https://slow.example/", "https://slow.example/team"),
            ])
            .hanging("https://slow.example/"),
        );
        let seeds = vec![
            seed("https://a.example/"),
            seed("https://down.example/"),
            seed("https://slow.example/"),
        ];

        let pages = resolve_pages(&seeds, resolver.clone(), &run_config(&dir, 2), &SilentProgress).await;

        assert_eq!(resolver.calls(), 3);
        let links: Vec<&str> = pages.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["https://a.example/team", "", ""]);
        assert_eq!(pages[1].url, "https://down.example/");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn seeds_without_url_skip_the_resolver() {
        let (dir, _store) = temp_store();
        let resolver = Arc::new(FakeResolver::new(&[("https://a.example/", "https://a.example/team")]));
        let seeds = vec![
            SeedRecord::new("", "", "Austin, TX"),
            seed("https://a.example/"),
        ];

        let pages = resolve_pages(&seeds, resolver.clone(), &run_config(&dir, 1), &SilentProgress).await;

        assert_eq!(resolver.calls(), 1);
        assert_eq!(pages.len(), 2);
        assert!(!pages[0].is_resolved());
        assert_eq!(pages[0].location, "Austin, TX");
        assert_eq!(pages[1].link, "https://a.example/team");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn duplicate_seeds_resolve_once() {
        let (dir, _store) = temp_store();
        let resolver = Arc::new(FakeResolver::new(&[("https://a.example/", "https://a.example/team")]));
        let seeds = vec![
            SeedRecord::new("First", "https://a.example/", "NY"),
            SeedRecord::new("Second", "https://a.example/", "NJ"),
        ];

        let pages = resolve_pages(&seeds, resolver.clone(), &run_config(&dir, 1), &SilentProgress).await;

        assert_eq!(resolver.calls(), 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, "First");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn checkpointed_page_list_skips_resolver() {
        let (dir, store) = temp_store();
        let resolver = Arc::new(FakeResolver::new(&[("https://a.example/", "https://a.example/team")]));
        let seeds = vec![seed("https://a.example/")];
        let config = run_config(&dir, 1);

        let (first, ran) =
            load_or_resolve_pages(&store, &seeds, resolver.clone(), &config, &SilentProgress)
                .await
                .unwrap();
        assert!(ran);
        assert!(store.exists("pages_list.csv"));

        let (second, ran) =
            load_or_resolve_pages(&store, &seeds, resolver.clone(), &config, &SilentProgress)
                .await
                .unwrap();
        assert!(!ran);
        assert_eq!(first, second);
        assert_eq!(resolver.calls(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn corrupt_page_list_is_not_silently_regenerated() {
        let (dir, store) = temp_store();
        store.write("pages_list.csv", "Name,Link\nonly,two\n").unwrap();
        let resolver = Arc::new(FakeResolver::new(&[]));

        let err = load_or_resolve_pages(
            &store,
            &[seed("https://a.example/")],
            resolver.clone(),
            &run_config(&dir, 1),
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(err.is_parse());
        assert_eq!(resolver.calls(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
