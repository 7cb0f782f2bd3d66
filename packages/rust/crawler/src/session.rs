//! The shared collaborator session.
//!
//! One [`Session`] is created per run and handed to every collaborator as an
//! `Arc<Session>`. It owns the HTTP client, paces requests so the run never
//! hits a site faster than `rate_limit_ms`, and refuses private/loopback
//! targets unless explicitly allowed. Dropping the last `Arc` releases it.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use teamscrape_shared::{HttpConfig, Result, TeamScrapeError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// A fetched document.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: Url,
    /// Response body.
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Paced HTTP session shared by every collaborator in a run.
pub struct Session {
    client: Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    allow_private_hosts: bool,
}

impl Session {
    /// Build a session from the `[http]` config section.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TeamScrapeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            min_interval: Duration::from_millis(config.rate_limit_ms),
            last_request: Mutex::new(None),
            allow_private_hosts: false,
        })
    }

    /// Allow localhost/private IPs (for mock servers in tests).
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wait until the next request slot is free and claim it.
    async fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }

    /// GET `url` and return status, final URL and body, whatever the status.
    pub async fn fetch(&self, url: &str) -> Result<Fetched> {
        let parsed = Url::parse(url)
            .map_err(|e| TeamScrapeError::validation(format!("invalid URL '{url}': {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&parsed) {
            warn!(%url, "refusing private or non-HTTP target");
            return Err(TeamScrapeError::Network(format!("{url}: blocked target")));
        }

        self.pace().await;
        debug!(%url, "fetching");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| TeamScrapeError::Network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| TeamScrapeError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(Fetched {
            status,
            url: final_url,
            body,
        })
    }

    /// GET `url`, failing on any non-2xx status.
    pub async fn fetch_ok(&self, url: &str) -> Result<Fetched> {
        let fetched = self.fetch(url).await?;
        if !fetched.is_success() {
            return Err(TeamScrapeError::Network(format!(
                "{url}: HTTP {}",
                fetched.status
            )));
        }
        Ok(fetched)
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
