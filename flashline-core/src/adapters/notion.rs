//! Notion API client
//!
//! Reads page titles and block children through the Notion REST API and
//! exposes them through the [`ContentSource`] port. OAuth authorization
//! (authorize URL + code exchange) is provided by [`NotionOAuth`].
//!
//! API Documentation: https://developers.notion.com/reference

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::config::NotionSettings;
use crate::domain::result::{Error, Result};
use crate::domain::{Block, NotionCredential, UNTITLED};
use crate::ports::{AuthorizationProvider, ContentSource};

/// Maximum page size accepted by the blocks endpoint
const PAGE_SIZE: usize = 100;

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the OAuth client secret (never stored in settings.json)
pub const NOTION_CLIENT_SECRET_ENV: &str = "NOTION_CLIENT_SECRET";

// =============================================================================
// API Response Models
// =============================================================================

/// Paginated list of block children
#[derive(Debug, Deserialize)]
struct BlockChildrenResponse {
    results: Vec<Block>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    properties: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    workspace_id: Option<String>,
    #[serde(default)]
    workspace_name: Option<String>,
    #[serde(default)]
    workspace_icon: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
}

impl From<TokenResponse> for NotionCredential {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            workspace_id: token.workspace_id,
            workspace_name: token.workspace_name,
            workspace_icon: token.workspace_icon,
            bot_id: token.bot_id,
        }
    }
}

/// Pull the title out of a page's property map
///
/// Every page has exactly one property of type `title`, but its key is
/// user-defined ("title" for plain pages, "Name" in databases, ...).
fn extract_title(properties: &serde_json::Map<String, JsonValue>) -> String {
    let title: String = properties
        .values()
        .find(|prop| prop.get("type").and_then(|t| t.as_str()) == Some("title"))
        .and_then(|prop| prop.get("title"))
        .and_then(|runs| runs.as_array())
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("plain_text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title.trim().to_string()
    }
}

// =============================================================================
// Notion HTTP Client
// =============================================================================

/// Notion API client bound to one access token
#[derive(Debug)]
pub struct NotionClient {
    client: Client,
    token: String,
    base_url: String,
    api_version: String,
}

impl NotionClient {
    pub fn new(token: &str, settings: &NotionSettings) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::SourceUnauthorized(
                "Notion access token cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
        })
    }

    /// Fetch every top-level child block of a page, following pagination
    pub fn get_block_children(&self, page_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/blocks/{}/children?page_size={}",
                self.base_url, page_id, PAGE_SIZE
            );
            if let Some(c) = &cursor {
                url.push_str(&format!("&start_cursor={}", c));
            }

            let response = self.get(&url)?;
            let page: BlockChildrenResponse = response.json().map_err(|e| {
                Error::SourceUnavailable(format!("Failed to parse block children: {}", e))
            })?;

            blocks.extend(page.results);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(page_id, count = blocks.len(), "fetched block children");
        Ok(blocks)
    }

    /// Fetch a page's title
    pub fn get_page_title(&self, page_id: &str) -> Result<String> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let response = self.get(&url)?;
        let page: PageResponse = response
            .json()
            .map_err(|e| Error::SourceUnavailable(format!("Failed to parse page: {}", e)))?;
        Ok(extract_title(&page.properties))
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .send()
            .map_err(map_request_error)?;

        check_response_status(&response)?;
        Ok(response)
    }
}

/// Map request errors to source errors
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::SourceUnavailable(format!(
            "Connection timed out after {} seconds",
            TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        Error::SourceUnavailable("Unable to connect to Notion servers".to_string())
    } else {
        Error::SourceUnavailable(format!("Notion request failed: {}", error))
    }
}

/// Check response status and return appropriate errors
fn check_response_status(response: &reqwest::blocking::Response) -> Result<()> {
    match response.status().as_u16() {
        200 => Ok(()),
        401 => Err(Error::SourceUnauthorized(
            "Notion authentication failed. The access token may be invalid or revoked.".to_string(),
        )),
        403 => Err(Error::SourceUnauthorized(
            "Notion access denied. Share the page with the integration.".to_string(),
        )),
        404 => Err(Error::not_found(
            "Notion page not found or not shared with the integration",
        )),
        429 => Err(Error::SourceUnavailable(
            "Notion rate limit exceeded. Please wait a moment and try again.".to_string(),
        )),
        status => Err(Error::SourceUnavailable(format!(
            "Notion API error: HTTP {}",
            status
        ))),
    }
}

// =============================================================================
// NotionContentSource - implements ContentSource
// =============================================================================

/// Content source backed by the live Notion API
pub struct NotionContentSource {
    settings: NotionSettings,
}

impl NotionContentSource {
    pub fn new(settings: NotionSettings) -> Self {
        Self { settings }
    }

    fn client(&self, credential: &NotionCredential) -> Result<NotionClient> {
        NotionClient::new(&credential.access_token, &self.settings)
    }
}

impl ContentSource for NotionContentSource {
    fn name(&self) -> &str {
        "notion"
    }

    fn fetch_blocks(&self, credential: &NotionCredential, page_id: &str) -> Result<Vec<Block>> {
        self.client(credential)?.get_block_children(page_id)
    }

    fn fetch_title(&self, credential: &NotionCredential, page_id: &str) -> Result<String> {
        self.client(credential)?.get_page_title(page_id)
    }
}

// =============================================================================
// NotionOAuth - implements AuthorizationProvider
// =============================================================================

/// Public OAuth integration flow
pub struct NotionOAuth {
    settings: NotionSettings,
    client_secret: Option<String>,
}

impl NotionOAuth {
    /// Build from settings; the client secret comes from `NOTION_CLIENT_SECRET`
    pub fn new(settings: NotionSettings) -> Self {
        let client_secret = std::env::var(NOTION_CLIENT_SECRET_ENV).ok();
        Self::with_secret(settings, client_secret)
    }

    pub fn with_secret(settings: NotionSettings, client_secret: Option<String>) -> Self {
        Self {
            settings,
            client_secret,
        }
    }

    fn client_id(&self) -> Result<&str> {
        self.settings
            .client_id
            .as_deref()
            .ok_or_else(|| Error::Config("notion.clientId is not configured".to_string()))
    }

    fn redirect_uri(&self) -> Result<&str> {
        self.settings
            .redirect_uri
            .as_deref()
            .ok_or_else(|| Error::Config("notion.redirectUri is not configured".to_string()))
    }
}

impl AuthorizationProvider for NotionOAuth {
    fn authorize_url(&self, state: &str) -> Result<String> {
        let base = format!(
            "{}/oauth/authorize",
            self.settings.base_url.trim_end_matches('/')
        );
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.client_id()?),
                ("response_type", "code"),
                ("owner", "user"),
                ("redirect_uri", self.redirect_uri()?),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid Notion base URL: {}", e)))?;

        Ok(url.to_string())
    }

    fn exchange_code(&self, code: &str) -> Result<NotionCredential> {
        let secret = self.client_secret.as_deref().ok_or_else(|| {
            Error::Config(format!("{} is not set", NOTION_CLIENT_SECRET_ENV))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let url = format!(
            "{}/oauth/token",
            self.settings.base_url.trim_end_matches('/')
        );
        let response = client
            .post(&url)
            .basic_auth(self.client_id()?, Some(secret))
            .header("Notion-Version", &self.settings.api_version)
            .json(&serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": self.redirect_uri()?,
            }))
            .send()
            .map_err(map_request_error)?;

        check_response_status(&response)?;

        let token: TokenResponse = response
            .json()
            .map_err(|e| Error::SourceUnavailable(format!("Failed to parse token: {}", e)))?;
        Ok(token.into())
    }
}

// =============================================================================
// Tests
// =============================================================================
