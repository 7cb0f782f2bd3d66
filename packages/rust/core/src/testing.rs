//! In-memory collaborators that count their calls.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use teamscrape_crawler::{PageResolver, TeamPageExtractor};
use teamscrape_discovery::ContactSource;
use teamscrape_shared::{Result, RunConfig, SeedRecord, TeamMember, TeamScrapeError};
use teamscrape_storage::CheckpointStore;
use uuid::Uuid;

pub struct FakeSource {
    pub seeds: Vec<SeedRecord>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(seeds: Vec<SeedRecord>) -> Self {
        Self {
            seeds,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactSource for FakeSource {
    async fn discover(&self) -> Result<Vec<SeedRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.seeds.clone())
    }
}

/// Maps seed URL to link. Unknown seeds fail; `hang` seeds never answer.
pub struct FakeResolver {
    pub links: HashMap<String, String>,
    pub hang: Vec<String>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new(links: &[(&str, &str)]) -> Self {
        Self {
            links: links
                .iter()
                .map(|(u, l)| (u.to_string(), l.to_string()))
                .collect(),
            hang: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.hang.push(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageResolver for FakeResolver {
    async fn resolve(&self, seed: &SeedRecord) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.contains(&seed.url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.links
            .get(&seed.url)
            .cloned()
            .ok_or_else(|| TeamScrapeError::Resolution(format!("{}: unreachable", seed.url)))
    }
}

/// Maps link to members. Unknown links fail; `hang` links never answer.
pub struct FakeExtractor {
    pub members: HashMap<String, Vec<TeamMember>>,
    pub hang: Vec<String>,
    pub calls: AtomicUsize,
    pub seen: std::sync::Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(members: &[(&str, Vec<TeamMember>)]) -> Self {
        Self {
            members: members
                .iter()
                .map(|(l, m)| (l.to_string(), m.clone()))
                .collect(),
            hang: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn hanging(mut self, link: &str) -> Self {
        self.hang.push(link.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TeamPageExtractor for FakeExtractor {
    async fn extract(&self, url: &str) -> Result<Vec<TeamMember>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_string());
        if self.hang.iter().any(|h| h == url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.members
            .get(url)
            .cloned()
            .ok_or_else(|| TeamScrapeError::Extraction(format!("{url}: no content")))
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("teamscrape-core-{}", Uuid::now_v7()))
}

pub fn temp_store() -> (PathBuf, Arc<CheckpointStore>) {
    let dir = temp_dir();
    let store = Arc::new(CheckpointStore::open(&dir).unwrap());
    (dir, store)
}

pub fn run_config(dir: &std::path::Path, concurrency: usize) -> RunConfig {
    RunConfig {
        data_dir: dir.to_path_buf(),
        concurrency,
        call_timeout: Duration::from_millis(200),
    }
}
