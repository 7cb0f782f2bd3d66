//! Team-page extraction.
//!
//! A [`TeamPageExtractor`] turns one organization URL into the people it
//! lists. [`LlmTeamExtractor`] fetches the page plus a handful of same-site
//! links, converts each to Markdown and asks a chat model for names and
//! positions.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use teamscrape_shared::{LlmConfig, Result, TeamMember, TeamScrapeError};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::llm::LlmClient;
use crate::session::Session;

/// Extracts the team members listed on an organization's site.
///
/// An error means the whole link failed; callers record an empty artifact.
#[async_trait]
pub trait TeamPageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Vec<TeamMember>>;
}

/// Page fetcher plus chat-model extraction.
pub struct LlmTeamExtractor {
    session: Arc<Session>,
    llm: LlmClient,
    max_linked_pages: usize,
    max_content_chars: usize,
}

impl LlmTeamExtractor {
    pub fn new(session: Arc<Session>, llm: LlmClient, config: &LlmConfig) -> Self {
        Self {
            session,
            llm,
            max_linked_pages: config.max_linked_pages.max(1),
            max_content_chars: config.max_content_chars,
        }
    }

    /// Build an extractor whose API key comes from the environment.
    pub fn from_env(session: Arc<Session>, config: &LlmConfig) -> Result<Self> {
        let llm = LlmClient::from_env(config)?;
        Ok(Self::new(session, llm, config))
    }

    async fn extract_page(&self, url: &str, html: &str) -> Result<Vec<TeamMember>> {
        let markdown = html_to_markdown(html)?;
        let markdown = truncate_content(&markdown, self.max_content_chars);
        self.llm.extract_team_members(url, &markdown).await
    }
}

#[async_trait]
impl TeamPageExtractor for LlmTeamExtractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &str) -> Result<Vec<TeamMember>> {
        let url = ensure_protocol(url);
        let first = self
            .session
            .fetch_ok(&url)
            .await
            .map_err(|e| TeamScrapeError::Extraction(e.to_string()))?;

        let pages = same_site_links(&first.body, &first.url, self.max_linked_pages);
        debug!(pages = pages.len(), "collected pages to extract");

        let mut members = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (i, page) in pages.iter().enumerate() {
            let body = if i == 0 {
                first.body.clone()
            } else {
                match self.session.fetch_ok(page).await {
                    Ok(fetched) => fetched.body,
                    Err(e) => {
                        warn!(%page, error = %e, "skipping linked page");
                        continue;
                    }
                }
            };

            match self.extract_page(page, &body).await {
                Ok(found) => {
                    succeeded += 1;
                    members.extend(found);
                }
                Err(e) => {
                    warn!(%page, error = %e, "page extraction failed");
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(dedupe_members(members))
    }
}

/// Prepend `https://` when the URL has no scheme.
pub fn ensure_protocol(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches("//"))
    }
}

/// The page itself followed by its same-host links, deduplicated and capped.
fn same_site_links(html: &str, base: &Url, cap: usize) -> Vec<String> {
    let mut base = base.clone();
    base.set_fragment(None);

    let mut seen = HashSet::new();
    let mut out = vec![base.to_string()];
    seen.insert(base.to_string());

    let Ok(link_sel) = Selector::parse("a[href]") else {
        return out;
    };
    let doc = Html::parse_document(html);

    for el in doc.select(&link_sel) {
        if out.len() >= cap {
            break;
        }
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if resolved.host_str() != base.host_str() {
            continue;
        }
        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            out.push(link);
        }
    }

    out.truncate(cap);
    out
}

fn html_to_markdown(html: &str) -> Result<String> {
    static BLANK_RUNS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg", "head"])
        .build();
    let markdown = converter
        .convert(html)
        .map_err(|e| TeamScrapeError::Extraction(format!("HTML to Markdown failed: {e}")))?;

    Ok(BLANK_RUNS.replace_all(markdown.trim(), "\n\n").into_owned())
}

/// Cut `content` to at most `max_chars` characters.
fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((idx, _)) => format!("{}\n\n[... content truncated ...]", &content[..idx]),
    }
}

/// Drop repeated names (case-insensitive), keeping the first occurrence.
fn dedupe_members(members: Vec<TeamMember>) -> Vec<TeamMember> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|m| seen.insert(m.name.to_lowercase()))
        .collect()
}
