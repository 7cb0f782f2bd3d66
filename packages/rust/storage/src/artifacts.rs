//! Typed access to the pipeline's named artifacts.
//!
//! ```text
//! <data_dir>/
//! ├── contacts_list.csv          Name,Url,Location       (seeds)
//! ├── pages_list.csv             Name,Link,Location,Url  (resolved pages)
//! ├── team_members_<key>.json    [{Url, name, position}] (one per page)
//! └── final_team_members.csv     Url,Name,Title,Company,Location
//! ```

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use teamscrape_shared::{
    ConsolidatedRow, PersonRecord, ResolvedPage, Result, SeedRecord, TeamScrapeError,
};
use tracing::{debug, warn};

use crate::csv;
use crate::{CheckpointStore, sanitize_key};

/// Seed list artifact.
pub const CONTACTS_KEY: &str = "contacts_list.csv";
/// Resolved page list artifact.
pub const PAGES_KEY: &str = "pages_list.csv";
/// Consolidated output artifact.
pub const CONSOLIDATED_KEY: &str = "final_team_members.csv";
/// Namespace prefix of per-page member artifacts.
pub const MEMBERS_PREFIX: &str = "team_members_";
/// Extension of per-page member artifacts.
pub const MEMBERS_SUFFIX: &str = ".json";

pub const SEED_COLUMNS: [&str; 3] = ["Name", "Url", "Location"];
pub const PAGES_COLUMNS: [&str; 4] = ["Name", "Link", "Location", "Url"];
pub const CONSOLIDATED_COLUMNS: [&str; 5] = ["Url", "Name", "Title", "Company", "Location"];

/// Longest sanitized link kept verbatim in a member key, in bytes.
const MAX_LINK_STEM: usize = 160;

/// Key of the member artifact for a team-page link.
///
/// Links whose sanitized form exceeds [`MAX_LINK_STEM`] bytes keep their
/// first characters plus a SHA-256 digest of the full link, so the key
/// stays a valid file name.
pub fn members_key(link: &str) -> String {
    let sanitized = sanitize_key(link);
    if sanitized.len() <= MAX_LINK_STEM {
        return format!("{MEMBERS_PREFIX}{sanitized}{MEMBERS_SUFFIX}");
    }

    let mut cut = MAX_LINK_STEM;
    while !sanitized.is_char_boundary(cut) {
        cut -= 1;
    }
    let digest = format!("{:x}", Sha256::digest(link.as_bytes()));
    format!(
        "{MEMBERS_PREFIX}{}_{}{MEMBERS_SUFFIX}",
        &sanitized[..cut],
        &digest[..16]
    )
}

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

/// Parse seed CSV text.
///
/// The header row is optional. Fields are trimmed, every row must have
/// exactly three fields, and duplicate URLs keep their first occurrence.
pub fn parse_seeds(text: &str) -> Result<Vec<SeedRecord>> {
    let mut rows = csv::parse_rows(text)?;

    let has_header = rows.first().is_some_and(|first| {
        first.len() == SEED_COLUMNS.len()
            && first
                .iter()
                .zip(SEED_COLUMNS)
                .all(|(cell, col)| cell.trim().eq_ignore_ascii_case(col))
    });
    if has_header {
        rows.remove(0);
    }

    let offset = if has_header { 2 } else { 1 };
    let seeds = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [name, url, location] => Ok(SeedRecord::new(name.trim(), url.trim(), location.trim())),
            _ => Err(TeamScrapeError::parse(format!(
                "{CONTACTS_KEY}: row {} has {} fields, expected 3",
                i + offset,
                row.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(dedupe_seeds(seeds))
}

/// Drop seeds whose URL was already seen. First occurrence wins.
pub fn dedupe_seeds(seeds: Vec<SeedRecord>) -> Vec<SeedRecord> {
    let mut seen = HashSet::new();
    let total = seeds.len();
    let unique: Vec<SeedRecord> = seeds
        .into_iter()
        .filter(|s| seen.insert(s.url.clone()))
        .collect();

    if unique.len() < total {
        warn!(
            duplicates = total - unique.len(),
            "dropped seeds with duplicate URLs"
        );
    }
    unique
}

impl CheckpointStore {
    /// Load the seed list.
    pub fn load_seeds(&self) -> Result<Vec<SeedRecord>> {
        let seeds = parse_seeds(&self.read(CONTACTS_KEY)?)?;
        debug!(count = seeds.len(), "loaded seeds");
        Ok(seeds)
    }

    /// Persist the seed list with a header row.
    pub fn save_seeds(&self, seeds: &[SeedRecord]) -> Result<()> {
        let rows: Vec<Vec<&str>> = seeds
            .iter()
            .map(|s| vec![s.name.as_str(), s.url.as_str(), s.location.as_str()])
            .collect();
        self.write(CONTACTS_KEY, &csv::to_csv_string(&SEED_COLUMNS, &rows))
    }

    // -----------------------------------------------------------------------
    // Resolved pages
    // -----------------------------------------------------------------------

    /// Load the resolved page list. The header row is required.
    pub fn load_pages(&self) -> Result<Vec<ResolvedPage>> {
        let text = self.read(PAGES_KEY)?;
        let rows = csv::parse_table(&text, &PAGES_COLUMNS)
            .map_err(|e| TeamScrapeError::parse(format!("{PAGES_KEY}: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|mut row| {
                // parse_table returns fields in PAGES_COLUMNS order
                let url = row.pop().unwrap_or_default();
                let location = row.pop().unwrap_or_default();
                let link = row.pop().unwrap_or_default();
                let name = row.pop().unwrap_or_default();
                ResolvedPage {
                    name,
                    link,
                    location,
                    url,
                }
            })
            .collect())
    }

    /// Persist the resolved page list with a header row.
    pub fn save_pages(&self, pages: &[ResolvedPage]) -> Result<()> {
        let rows: Vec<Vec<&str>> = pages
            .iter()
            .map(|p| vec![p.name.as_str(), p.link.as_str(), p.location.as_str(), p.url.as_str()])
            .collect();
        self.write(PAGES_KEY, &csv::to_csv_string(&PAGES_COLUMNS, &rows))
    }

    // -----------------------------------------------------------------------
    // Per-page members
    // -----------------------------------------------------------------------

    /// Keys of every persisted member artifact, sorted.
    pub fn list_member_keys(&self) -> Result<Vec<String>> {
        self.list(MEMBERS_PREFIX, MEMBERS_SUFFIX)
    }

    /// Load one member artifact.
    pub fn load_members(&self, key: &str) -> Result<Vec<PersonRecord>> {
        self.read_json(key)
    }

    /// Persist one member artifact. An empty list is a valid outcome.
    pub fn save_members(&self, key: &str, members: &[PersonRecord]) -> Result<()> {
        self.write_json(key, members)
    }

    // -----------------------------------------------------------------------
    // Consolidated output
    // -----------------------------------------------------------------------

    /// Persist the consolidated table with a header row.
    pub fn save_consolidated(&self, rows: &[ConsolidatedRow]) -> Result<()> {
        let cells: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| {
                vec![
                    r.url.as_str(),
                    r.name.as_str(),
                    r.title.as_str(),
                    r.company.as_str(),
                    r.location.as_str(),
                ]
            })
            .collect();
        self.write(CONSOLIDATED_KEY, &csv::to_csv_string(&CONSOLIDATED_COLUMNS, &cells))
    }

    /// Load the consolidated table.
    pub fn load_consolidated(&self) -> Result<Vec<ConsolidatedRow>> {
        let text = self.read(CONSOLIDATED_KEY)?;
        let rows = csv::parse_table(&text, &CONSOLIDATED_COLUMNS)
            .map_err(|e| TeamScrapeError::parse(format!("{CONSOLIDATED_KEY}: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut fields = row.into_iter();
                let mut next = || fields.next().unwrap_or_default();
                ConsolidatedRow {
                    url: next(),
                    name: next(),
                    title: next(),
                    company: next(),
                    location: next(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_store() -> CheckpointStore {
        let tmp = std::env::temp_dir().join(format!("ts_artifacts_{}", Uuid::now_v7()));
        CheckpointStore::open(&tmp).expect("open test store")
    }

    #[test]
    fn members_key_matches_naming_rule() {
        assert_eq!(
            members_key("https://acme.example/team"),
            "team_members_https___acme_example_team.json"
        );
        assert_ne!(members_key("https://a.com/team"), members_key("https://b.com/team"));
    }

    #[test]
    fn long_links_get_bounded_distinct_keys() {
        let base = format!("https://acme.example/team?{}", "utm_x=1&".repeat(40));
        let other = format!("{base}utm_y=2");
        assert!(base.len() > 300);

        let key = members_key(&base);
        assert!(key.len() <= 200, "key too long: {}", key.len());
        assert!(key.starts_with("team_members_https___acme_example_team"));
        assert!(key.ends_with(".json"));
        assert_eq!(key, members_key(&base));
        assert_ne!(key, members_key(&other));

        let store = test_store();
        let person = PersonRecord {
            source_url: base.clone(),
            name: "Jane Doe".into(),
            position: "Director".into(),
        };
        store.save_members(&key, &[person.clone()]).unwrap();
        assert_eq!(store.list_member_keys().unwrap(), vec![key.clone()]);
        assert_eq!(store.load_members(&key).unwrap(), vec![person]);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn seeds_without_header() {
        let seeds = parse_seeds("Acme , https://dir.example/acme, NY\n").unwrap();
        assert_eq!(seeds, vec![SeedRecord::new("Acme", "https://dir.example/acme", "NY")]);
    }

    #[test]
    fn seeds_header_is_skipped() {
        let seeds = parse_seeds("Name,Url,Location\nAcme,https://a.example,NY\n").unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "Acme");
    }

    #[test]
    fn seeds_wrong_field_count_is_parse_error() {
        let err = parse_seeds("Acme,https://a.example\n").unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("row 1 has 2 fields"));

        let err = parse_seeds("Name,Url,Location\nA,b,c\nA,b,c,d\n").unwrap_err();
        assert!(err.to_string().contains("row 3 has 4 fields"));
    }

    #[test]
    fn duplicate_seed_urls_keep_first() {
        let text = "Acme,https://a.example,NY\nAcme Two,https://a.example,LA\nBeta,https://b.example,TX\n";
        let seeds = parse_seeds(text).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].name, "Acme");
        assert_eq!(seeds[0].location, "NY");
        assert_eq!(seeds[1].name, "Beta");
    }

    #[test]
    fn seeds_roundtrip_through_store() {
        let store = test_store();
        let seeds = vec![
            SeedRecord::new("Acme, Inc.", "https://a.example", "New York, NY"),
            SeedRecord::new("Beta", "https://b.example", ""),
        ];
        store.save_seeds(&seeds).unwrap();

        let text = store.read(CONTACTS_KEY).unwrap();
        assert!(text.starts_with("Name,Url,Location\n"));
        assert_eq!(store.load_seeds().unwrap(), seeds);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn pages_roundtrip_keeps_empty_links() {
        let store = test_store();
        let pages = vec![
            ResolvedPage {
                name: "Acme".into(),
                link: "https://acme.example/team".into(),
                location: "NY".into(),
                url: "https://dir.example/acme".into(),
            },
            ResolvedPage {
                name: "Ghost".into(),
                link: String::new(),
                location: "TX".into(),
                url: "https://dir.example/ghost".into(),
            },
        ];
        store.save_pages(&pages).unwrap();
        assert!(store.read(PAGES_KEY).unwrap().starts_with("Name,Link,Location,Url\n"));
        assert_eq!(store.load_pages().unwrap(), pages);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn pages_without_header_is_parse_error() {
        let store = test_store();
        store.write(PAGES_KEY, "Acme,https://acme.example,NY,https://dir.example\n").unwrap();
        assert!(store.load_pages().unwrap_err().is_parse());
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn members_roundtrip_and_empty_list() {
        let store = test_store();
        let key = members_key("https://acme.example/team");
        let members = vec![PersonRecord {
            source_url: "https://acme.example/team".into(),
            name: "Jane Doe".into(),
            position: "Director".into(),
        }];
        store.save_members(&key, &members).unwrap();
        assert_eq!(store.load_members(&key).unwrap(), members);

        let empty_key = members_key("https://empty.example");
        store.save_members(&empty_key, &[]).unwrap();
        assert!(store.exists(&empty_key));
        assert!(store.load_members(&empty_key).unwrap().is_empty());

        assert_eq!(store.list_member_keys().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn consolidated_roundtrip() {
        let store = test_store();
        let rows = vec![ConsolidatedRow {
            url: "https://acme.example/team".into(),
            name: "Jane Doe".into(),
            title: "Director, Clinical".into(),
            company: "Acme".into(),
            location: "NY".into(),
        }];
        store.save_consolidated(&rows).unwrap();
        assert!(
            store
                .read(CONSOLIDATED_KEY)
                .unwrap()
                .starts_with("Url,Name,Title,Company,Location\n")
        );
        assert_eq!(store.load_consolidated().unwrap(), rows);
        let _ = std::fs::remove_dir_all(store.root());
    }
}
