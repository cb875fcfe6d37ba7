//! Crossref API client for author resolution.
//!
//! Looks up a work by exact DOI filter and returns the positionally first and
//! last entries of its author list.

use crate::config::{endpoint, Config};
use crate::error::{CiteGenderError, FetchError, Result};
use crate::sources::MetadataIndex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Works endpoint, relative to the Crossref base URL
const WORKS_PATH: &str = "/works";

/// One author entry as reported by Crossref
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Given name(s), possibly initials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    /// Family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// "first" or "additional"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliation: Vec<Affiliation>,
}

/// Author affiliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    #[serde(default)]
    pub name: String,
}

/// First and last author of a work, by position.
///
/// Both are empty when the work is unknown or declares no authors. For a
/// single-author work both hold the same entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorPair {
    pub first: Author,
    pub last: Author,
}

impl AuthorPair {
    /// Pick first and last from an ordered author list
    pub fn from_authors(authors: &[Author]) -> Self {
        match (authors.first(), authors.last()) {
            (Some(first), Some(last)) => Self {
                first: first.clone(),
                last: last.clone(),
            },
            _ => Self::default(),
        }
    }
}

/// Crossref API client
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: Url,
    mailto: String,
}

impl CrossrefClient {
    /// Create a new CrossrefClient from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("citegender/{} (mailto:{})", env!("CARGO_PKG_VERSION"), config.mailto))
            .timeout(config.timeout)
            .build()
            .map_err(|e| CiteGenderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.crossref_url.clone(),
            mailto: config.mailto.clone(),
        })
    }

    /// Internal lookup implementation
    async fn do_lookup(&self, doi: &str) -> std::result::Result<AuthorPair, FetchError> {
        let filter = format!("doi:{}", doi);
        let response = self
            .client
            .get(endpoint(&self.base_url, WORKS_PATH))
            .query(&[
                ("filter", filter.as_str()),
                ("select", "DOI,author"),
                ("rows", "1"),
                ("mailto", self.mailto.as_str()),
            ])
            .send()
            .await?;

        // Check rate limit headers
        if let Some(limit) = response.headers().get("X-Rate-Limit-Limit") {
            debug!(limit = ?limit, "Rate limit");
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::rate_limited(&response));
        }

        if !response.status().is_success() {
            return Err(FetchError::Status {
                code: response.status().as_u16(),
                message: format!("Crossref API error: {}", response.status()),
            });
        }

        let body = response.text().await?;
        let data = parse_works(&body)?;

        if data.message.total_results == 0 {
            debug!(doi = doi, "No Crossref record");
            return Ok(AuthorPair::default());
        }

        match data.message.items.into_iter().next() {
            Some(item) => Ok(AuthorPair::from_authors(&item.author.unwrap_or_default())),
            None => Ok(AuthorPair::default()),
        }
    }
}

#[async_trait]
impl MetadataIndex for CrossrefClient {
    async fn resolve_authors(&self, doi: &str) -> Result<AuthorPair> {
        self.do_lookup(doi)
            .await
            .map_err(|source| CiteGenderError::Resolution {
                doi: doi.to_string(),
                source,
            })
    }
}

// === Crossref API Response Types ===

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    #[serde(rename = "total-results")]
    total_results: u64,
    #[serde(default)]
    items: Vec<CrossrefItem>,
}

#[derive(Debug, Deserialize)]
struct CrossrefItem {
    #[serde(default)]
    author: Option<Vec<Author>>,
}

fn parse_works(body: &str) -> std::result::Result<CrossrefResponse, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("Crossref response: {}", e)))
}
