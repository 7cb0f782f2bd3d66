//! Application configuration for teamscrape.
//!
//! User config lives at `~/.teamscrape/teamscrape.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TeamScrapeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "teamscrape.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".teamscrape";

// ---------------------------------------------------------------------------
// Config structs (matching teamscrape.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Shared HTTP session settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Seed directory settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Team-page extraction model settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding every checkpoint artifact.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Concurrent collaborator calls per stage. 1 keeps a single serialized session.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Upper bound for one resolve/extract call, in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_concurrency() -> u32 {
    1
}
fn default_call_timeout() -> u64 {
    120
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Minimum ms between two requests on the shared session.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            rate_limit_ms: default_rate_limit(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_rate_limit() -> u64 {
    1000
}
fn default_user_agent() -> String {
    concat!("teamscrape/", env!("CARGO_PKG_VERSION")).into()
}

/// `[directory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// First page of the provider directory listing.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Stop after this many listing pages. 0 means until the listing runs out.
    #[serde(default)]
    pub max_pages: u32,

    /// CSS selector for the provider website on a directory detail page.
    #[serde(default = "default_website_selector")]
    pub website_selector: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_pages: 0,
            website_selector: default_website_selector(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.bhcoe.org/aba-therapy-directory/".into()
}
fn default_website_selector() -> String {
    "#main-content > div > div > div:nth-of-type(1) > div:nth-of-type(3) > \
     div:nth-of-type(1) > div:nth-of-type(3) > div > div:nth-of-type(2) > div"
        .into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat model used for team-member extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible API root.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Maximum same-site pages examined per team page (the page itself included).
    #[serde(default = "default_max_linked_pages")]
    pub max_linked_pages: usize,

    /// Page content is truncated to this many characters before prompting.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_llm_base_url(),
            max_linked_pages: default_max_linked_pages(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_max_linked_pages() -> usize {
    5
}
fn default_max_content_chars() -> usize {
    12_000
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Checkpoint directory.
    pub data_dir: PathBuf,
    /// Worker pool size per stage (at least 1).
    pub concurrency: usize,
    /// Per-call collaborator timeout.
    pub call_timeout: Duration,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.defaults.data_dir),
            concurrency: config.defaults.concurrency.max(1) as usize,
            call_timeout: Duration::from_secs(config.defaults.call_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.teamscrape/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TeamScrapeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.teamscrape/teamscrape.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TeamScrapeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TeamScrapeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TeamScrapeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TeamScrapeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TeamScrapeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("aba-therapy-directory"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
data_dir = "/tmp/teamscrape"
concurrency = 4

[llm]
model = "gpt-4o"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.data_dir, "/tmp/teamscrape");
        assert_eq!(config.defaults.concurrency, 4);
        assert_eq!(config.defaults.call_timeout_secs, 120);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.http.rate_limit_ms, 1000);
        assert_eq!(config.directory.max_pages, 0);
    }

    #[test]
    fn run_config_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.concurrency = 0;
        let run = RunConfig::from(&app);
        assert_eq!(run.data_dir, PathBuf::from("data"));
        assert_eq!(run.concurrency, 1);
        assert_eq!(run.call_timeout, Duration::from_secs(120));
    }
}
