//! Filesystem checkpoint store.
//!
//! The [`CheckpointStore`] maps keys to artifact files in one data directory.
//! Every pipeline stage uses it to decide "already done" versus "needs work":
//! an artifact that exists on disk is ground truth, and a unit of work runs
//! again only when its artifact is absent.
//!
//! **Guarantees:**
//! - writes are atomic (temp file + rename), so a killed run never leaves a
//!   half-written artifact under its real key
//! - a corrupt artifact surfaces as a parse error, never as "absent"
//! - [`CheckpointStore::lock`] serializes work on one key across tasks

mod artifacts;
pub mod csv;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use teamscrape_shared::{Result, TeamScrapeError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

pub use artifacts::{
    CONSOLIDATED_COLUMNS, CONSOLIDATED_KEY, CONTACTS_KEY, MEMBERS_PREFIX, MEMBERS_SUFFIX,
    PAGES_COLUMNS, PAGES_KEY, SEED_COLUMNS, dedupe_seeds, members_key, parse_seeds,
};

/// Characters replaced by `_` when a natural identifier becomes part of a key.
const KEY_UNSAFE_CHARS: &[char] = &['/', '.', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Turn an arbitrary identifier (usually a URL) into a filename-safe key
/// component.
///
/// Each of `/ . \ : * ? " < > |` and every ASCII control character becomes
/// `_`; everything else is kept. The mapping is lossy (`a.b` and `a/b`
/// collide) but deterministic.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if KEY_UNSAFE_CHARS.contains(&c) || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Key-addressed artifact storage rooted at one directory.
pub struct CheckpointStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CheckpointStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| TeamScrapeError::io(&root, e))?;
        debug!(root = %root.display(), "opened checkpoint store");
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the artifact stored under `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Whether an artifact exists under `key`. No side effects.
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read the artifact stored under `key` as UTF-8 text.
    pub fn read(&self, key: &str) -> Result<String> {
        let path = self.path_for(key)?;
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TeamScrapeError::not_found(format!("artifact '{key}'")),
            _ => TeamScrapeError::io(&path, e),
        })?;
        String::from_utf8(bytes)
            .map_err(|e| TeamScrapeError::parse(format!("artifact '{key}' is not UTF-8: {e}")))
    }

    /// Durably write `contents` under `key`, replacing any previous artifact.
    ///
    /// The bytes are synced to a temp file before it is renamed over the
    /// target, so readers see the old artifact or the new one, never a mix.
    pub fn write(&self, key: &str, contents: &str) -> Result<()> {
        let target = self.path_for(key)?;
        // Temp names do not embed the key, so they stay short.
        let temp = self.root.join(format!(".{}.tmp", Uuid::now_v7()));

        if let Err(e) = write_synced(&temp, contents.as_bytes()) {
            let _ = std::fs::remove_file(&temp);
            return Err(TeamScrapeError::io(&temp, e));
        }

        // Atomic rename
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(TeamScrapeError::io(&target, e));
        }

        debug!(key, bytes = contents.len(), "artifact written");
        Ok(())
    }

    /// Read and deserialize a JSON artifact.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let text = self.read(key)?;
        serde_json::from_str(&text)
            .map_err(|e| TeamScrapeError::parse(format!("invalid JSON in artifact '{key}': {e}")))
    }

    /// Serialize `value` as pretty JSON and write it under `key`.
    pub fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| TeamScrapeError::validation(format!("cannot serialize '{key}': {e}")))?;
        self.write(key, &json)
    }

    /// Delete the artifact under `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TeamScrapeError::io(&path, e)),
        }
    }

    /// List keys starting with `prefix` and ending with `suffix`, sorted.
    /// In-flight temp files are never listed.
    pub fn list(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| TeamScrapeError::io(&self.root, e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TeamScrapeError::io(&self.root, e))?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if name.starts_with(prefix) && name.ends_with(suffix) {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Acquire the per-key lock. Hold the guard across the
    /// `exists` → work → `write` sequence so two tasks never both do the work.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }
}

/// Write `bytes` to a new file and flush them to disk.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Longest key accepted, in bytes. Most filesystems cap names at 255.
const MAX_KEY_LEN: usize = 240;

/// Keys are bare file names inside the store root.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.chars().any(|c| c.is_ascii_control())
    {
        return Err(TeamScrapeError::validation(format!(
            "invalid checkpoint key: {key:?}"
        )));
    }
    Ok(())
}
