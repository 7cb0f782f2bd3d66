//! Minimal OpenAI-compatible chat client for team-member extraction.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use teamscrape_shared::{LlmConfig, Result, TeamMember, TeamScrapeError};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You extract people from organization web pages. \
Reply with a JSON object of the form \
{\"team_members\": [{\"name\": \"...\", \"position\": \"...\"}]}. \
Use an empty list when the page lists nobody.";

const USER_PROMPT: &str =
    "Extract the name and position of the team members. Remove duplicate names.";

/// Upper bound for one completion request.
const REQUEST_TIMEOUT_SECS: u64 = 90;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TeamMembersPayload {
    #[serde(default)]
    team_members: Vec<TeamMember>,
}

/// Chat-completion client bound to one model.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl LlmClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TeamScrapeError::Network(format!("failed to build LLM client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client reading the key from the env var named in `config`.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TeamScrapeError::config(format!(
                    "extraction API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;
        Self::new(key, config)
    }

    /// Ask the model for the team members listed in `markdown`.
    pub async fn extract_team_members(&self, url: &str, markdown: &str) -> Result<Vec<TeamMember>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("{USER_PROMPT}\n\nSource: {url}\n\n{markdown}"),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TeamScrapeError::Extraction(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(TeamScrapeError::Extraction(format!(
                "LLM returned HTTP {status}: {snippet}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| TeamScrapeError::Extraction(format!("invalid LLM response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TeamScrapeError::Extraction("LLM returned no content".into()))?;

        let members = parse_members(&content)?;
        debug!(%url, count = members.len(), "LLM extraction complete");
        Ok(members)
    }
}

/// Parse the model's JSON reply, tolerating a Markdown code fence.
fn parse_members(content: &str) -> Result<Vec<TeamMember>> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let payload: TeamMembersPayload = serde_json::from_str(json)
        .map_err(|e| TeamScrapeError::Extraction(format!("unusable LLM output: {e}")))?;

    Ok(payload
        .team_members
        .into_iter()
        .map(|m| TeamMember::new(m.name.trim(), m.position.trim()))
        .filter(|m| !m.name.is_empty())
        .collect())
}
