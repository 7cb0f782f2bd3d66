//! Core domain records flowing through the pipeline.
//!
//! Seeds → resolved pages → person records → consolidated rows. Field names
//! in the serde attributes match the column/key names of the on-disk
//! artifacts.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SeedRecord
// ---------------------------------------------------------------------------

/// An organization listed in the seed directory (`contacts_list.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRecord {
    /// Organization name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Directory entry URL; unique within a run.
    #[serde(rename = "Url")]
    pub url: String,
    /// City/state as shown in the directory.
    #[serde(rename = "Location")]
    pub location: String,
}

impl SeedRecord {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            location: location.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolvedPage
// ---------------------------------------------------------------------------

/// A seed joined with its resolved team-page link (`pages_list.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPage {
    #[serde(rename = "Name")]
    pub name: String,
    /// Canonical team-page URL. Empty means "unresolved".
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Location")]
    pub location: String,
    /// The originating seed URL.
    #[serde(rename = "Url")]
    pub url: String,
}

impl ResolvedPage {
    /// Build a resolved page from its seed and the resolved link.
    pub fn from_seed(seed: &SeedRecord, link: impl Into<String>) -> Self {
        Self {
            name: seed.name.clone(),
            link: link.into(),
            location: seed.location.clone(),
            url: seed.url.clone(),
        }
    }

    /// An unresolved page never goes through extraction.
    pub fn is_resolved(&self) -> bool {
        !self.link.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TeamMember / PersonRecord
// ---------------------------------------------------------------------------

/// A person as reported by a team-page extractor, before the caller stitches
/// in the page link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub position: String,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
        }
    }
}

/// One person found on a team page, as persisted in
/// `team_members_<key>.json`.
///
/// `source_url` refers back to [`ResolvedPage::link`] by value only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "Url", default)]
    pub source_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
}

impl PersonRecord {
    /// Stitch the page link into an extracted member.
    pub fn from_member(source_url: &str, member: TeamMember) -> Self {
        Self {
            source_url: source_url.to_string(),
            name: member.name,
            position: member.position,
        }
    }
}

// ---------------------------------------------------------------------------
// ConsolidatedRow
// ---------------------------------------------------------------------------

/// One row of `final_team_members.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedRow {
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Location")]
    pub location: String,
}

impl ConsolidatedRow {
    /// Join a person with its page. A missing page leaves company and
    /// location empty.
    pub fn join(person: &PersonRecord, page: Option<&ResolvedPage>) -> Self {
        Self {
            url: person.source_url.clone(),
            name: person.name.clone(),
            title: person.position.clone(),
            company: page.map(|p| p.name.clone()).unwrap_or_default(),
            location: page.map(|p| p.location.clone()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_record_uses_artifact_keys() {
        let person = PersonRecord::from_member(
            "https://acme.example/team",
            TeamMember::new("Jane Doe", "Director"),
        );
        let json = serde_json::to_string(&person).expect("serialize");
        assert!(json.contains(r#""Url":"https://acme.example/team""#));
        assert!(json.contains(r#""name":"Jane Doe""#));
        assert!(json.contains(r#""position":"Director""#));
    }

    #[test]
    fn person_record_tolerates_missing_fields() {
        let parsed: PersonRecord =
            serde_json::from_str(r#"{"name":"Solo"}"#).expect("deserialize");
        assert_eq!(parsed.name, "Solo");
        assert!(parsed.source_url.is_empty());
        assert!(parsed.position.is_empty());
    }

    #[test]
    fn resolved_page_from_seed() {
        let seed = SeedRecord::new("Acme", "https://dir.example/acme", "NY");
        let page = ResolvedPage::from_seed(&seed, "https://acme.example/team");
        assert_eq!(page.name, "Acme");
        assert_eq!(page.url, "https://dir.example/acme");
        assert!(page.is_resolved());
        assert!(!ResolvedPage::from_seed(&seed, "").is_resolved());
    }

    #[test]
    fn join_without_page_leaves_company_empty() {
        let person = PersonRecord::from_member("https://orphan.example", TeamMember::new("A", "B"));
        let row = ConsolidatedRow::join(&person, None);
        assert_eq!(row.url, "https://orphan.example");
        assert_eq!(row.title, "B");
        assert!(row.company.is_empty());
        assert!(row.location.is_empty());
    }
}
