//! Seed → team-page resolution.
//!
//! A [`PageResolver`] maps one seed to the URL of the organization's own
//! site. [`DirectoryPageResolver`] reads it off the seed's directory detail
//! page.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use teamscrape_shared::{Result, SeedRecord, TeamScrapeError};
use tracing::{debug, instrument};

use crate::session::Session;

/// Resolves a seed to its canonical team-page URL.
///
/// Errors are per-seed failures; callers degrade them to an empty link.
#[async_trait]
pub trait PageResolver: Send + Sync {
    async fn resolve(&self, seed: &SeedRecord) -> Result<String>;
}

/// Reads the provider website from a directory detail page.
pub struct DirectoryPageResolver {
    session: Arc<Session>,
    website: Selector,
}

impl DirectoryPageResolver {
    /// Create a resolver locating the website with `website_selector`.
    pub fn new(session: Arc<Session>, website_selector: &str) -> Result<Self> {
        let website = Selector::parse(website_selector).map_err(|e| {
            TeamScrapeError::config(format!("invalid website selector '{website_selector}': {e:?}"))
        })?;
        Ok(Self { session, website })
    }
}

#[async_trait]
impl PageResolver for DirectoryPageResolver {
    #[instrument(skip_all, fields(url = %seed.url))]
    async fn resolve(&self, seed: &SeedRecord) -> Result<String> {
        let fetched = self
            .session
            .fetch_ok(&seed.url)
            .await
            .map_err(|e| TeamScrapeError::Resolution(e.to_string()))?;

        let website = extract_website(&fetched.body, &self.website).ok_or_else(|| {
            TeamScrapeError::Resolution(format!("{}: contact details not found", seed.url))
        })?;

        debug!(%website, "resolved team page");
        Ok(website)
    }
}

/// Pull the website out of a detail page: the matched element's text, or
/// the first link inside it when the text is empty.
fn extract_website(html: &str, selector: &Selector) -> Option<String> {
    let doc = Html::parse_document(html);
    let element = doc.select(selector).next()?;

    let text = collapse_whitespace(element);
    if !text.is_empty() {
        return Some(text);
    }

    let link_sel = Selector::parse("a[href]").ok()?;
    element
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(String::from)
}

fn collapse_whitespace(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
