//! Seed acquisition.
//!
//! A [`ContactSource`] yields the organization seeds the pipeline starts
//! from. Two sources ship with the crate:
//! - [`CsvContactSource`] reads an existing `Name,Url,Location` file
//! - [`DirectoryContactSource`] walks the paginated provider directory

mod parser;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use teamscrape_crawler::Session;
use teamscrape_shared::{DirectoryConfig, Result, SeedRecord, TeamScrapeError};
use teamscrape_storage::{CheckpointStore, parse_seeds};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use parser::{ListingPage, normalize_dashes, parse_listing};

/// Supplies organization seed records.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Produce the seed list.
    async fn discover(&self) -> Result<Vec<SeedRecord>>;

    /// Discover, persist the seeds as `contacts_list.csv` with a header,
    /// and read them back so callers see exactly what is on disk.
    async fn produce_csv(&self, store: &CheckpointStore) -> Result<Vec<SeedRecord>> {
        let seeds = self.discover().await?;
        store.save_seeds(&seeds)?;
        store.load_seeds()
    }
}

// ---------------------------------------------------------------------------
// CSV source
// ---------------------------------------------------------------------------

/// Reads seeds from a CSV file.
pub struct CsvContactSource {
    path: PathBuf,
}

impl CsvContactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContactSource for CsvContactSource {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn discover(&self) -> Result<Vec<SeedRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TeamScrapeError::not_found(self.path.display().to_string())
                }
                _ => TeamScrapeError::io(&self.path, e),
            })?;
        let seeds = parse_seeds(&text)?;
        info!(count = seeds.len(), "loaded seeds from CSV");
        Ok(seeds)
    }
}

// ---------------------------------------------------------------------------
// Directory source
// ---------------------------------------------------------------------------

/// Crawls the paginated provider directory.
pub struct DirectoryContactSource {
    session: Arc<Session>,
    base_url: String,
    max_pages: u32,
}

impl DirectoryContactSource {
    pub fn new(session: Arc<Session>, config: &DirectoryConfig) -> Self {
        Self {
            session,
            base_url: config.base_url.clone(),
            max_pages: config.max_pages,
        }
    }

    /// URL of listing page `n` (1-based).
    pub fn page_url(&self, n: u32) -> String {
        if n <= 1 {
            return self.base_url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/page/{n}/")
    }
}

#[async_trait]
impl ContactSource for DirectoryContactSource {
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    async fn discover(&self) -> Result<Vec<SeedRecord>> {
        let mut seeds = Vec::new();
        let mut n = 1u32;

        loop {
            if self.max_pages > 0 && n > self.max_pages {
                debug!(max_pages = self.max_pages, "page limit reached");
                break;
            }

            let url = self.page_url(n);
            let fetched = match self.session.fetch(&url).await {
                Ok(f) => f,
                // Nothing discovered yet: the source is unavailable.
                Err(e) if n == 1 => return Err(e),
                Err(e) => {
                    warn!(%url, error = %e, "stopping directory crawl");
                    break;
                }
            };

            if fetched.status == 404 {
                debug!(%url, "listing ended with 404");
                break;
            }
            if !fetched.is_success() {
                if n == 1 {
                    return Err(TeamScrapeError::Network(format!(
                        "{url}: HTTP {}",
                        fetched.status
                    )));
                }
                warn!(%url, status = fetched.status, "stopping directory crawl");
                break;
            }

            let page_url = Url::parse(&url)
                .map_err(|e| TeamScrapeError::validation(format!("invalid URL '{url}': {e}")))?;
            let page = parse_listing(&fetched.body, &page_url);
            if page.is_last() {
                debug!(%url, "listing has no more cards");
                break;
            }

            debug!(page = n, cards = page.seeds.len(), "parsed listing page");
            seeds.extend(page.seeds);
            n += 1;
        }

        info!(count = seeds.len(), pages = n - 1, "directory crawl complete");
        Ok(seeds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
