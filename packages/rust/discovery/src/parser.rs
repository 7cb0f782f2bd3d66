//! Provider directory listing parser.
//!
//! A listing page holds one `article` card per provider inside
//! `.dp-dfg-items`:
//! - `h3.entry-title a`: provider name (text) and detail page (`href`)
//! - `.city-state`: location
//!
//! Past the last page the directory renders a `.dp-dfg-no-results` marker
//! instead of cards.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use teamscrape_shared::SeedRecord;
use url::Url;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One parsed listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Cards with at least one non-empty field, in page order.
    pub seeds: Vec<SeedRecord>,
    /// The page carried the end-of-listing marker.
    pub no_results: bool,
}

impl ListingPage {
    /// Whether crawling should stop after this page.
    pub fn is_last(&self) -> bool {
        self.no_results || self.seeds.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Patterns (compiled once)
// ---------------------------------------------------------------------------

static CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".dp-dfg-items article").expect("card selector"));

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.entry-title a").expect("title selector"));

static LOCATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".city-state").expect("location selector"));

static NO_RESULTS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".dp-dfg-no-results").expect("no-results selector"));

/// En or em dash with any surrounding whitespace.
static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\u{2013}\u{2014}]\s*").expect("dash regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one listing page. Relative detail links resolve against `page_url`.
pub fn parse_listing(html: &str, page_url: &Url) -> ListingPage {
    let doc = Html::parse_document(html);

    let no_results = doc.select(&NO_RESULTS_SEL).next().is_some();

    let seeds = doc
        .select(&CARD_SEL)
        .filter_map(|card| parse_card(card, page_url))
        .collect();

    ListingPage { seeds, no_results }
}

fn parse_card(card: ElementRef<'_>, page_url: &Url) -> Option<SeedRecord> {
    let title = card.select(&TITLE_SEL).next();

    let name = title
        .map(|a| normalize_dashes(&element_text(a)))
        .unwrap_or_default();

    let url = title
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| {
            page_url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string())
        })
        .unwrap_or_default();

    let location = card
        .select(&LOCATION_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default();

    if name.is_empty() && url.is_empty() && location.is_empty() {
        return None;
    }
    Some(SeedRecord::new(name, url, location))
}

/// Replace en/em dashes (and the whitespace around them) with `" - "`.
pub fn normalize_dashes(text: &str) -> String {
    DASH_RE.replace_all(text, " - ").into_owned()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
