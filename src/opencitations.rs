//! OpenCitations COCI client.
//!
//! Lists the DOIs of works citing a DOI via
//! `GET /index/coci/api/v1/citations/{doi}`.

use crate::config::{endpoint, Config};
use crate::error::{CiteGenderError, FetchError, Result};
use crate::sources::CitationIndex;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

/// COCI citations endpoint, relative to the OpenCitations base URL
const CITATIONS_PATH: &str = "/index/coci/api/v1/citations";

/// OpenCitations COCI client
pub struct OpenCitationsClient {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl OpenCitationsClient {
    /// Create a new client from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("citegender/{} (mailto:{})", env!("CARGO_PKG_VERSION"), config.mailto))
            .timeout(config.timeout)
            .build()
            .map_err(|e| CiteGenderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.opencitations_url.clone(),
            access_token: config.opencitations_token.clone(),
        })
    }

    async fn fetch(&self, doi: &str) -> std::result::Result<Vec<String>, FetchError> {
        let url = citations_url(&self.base_url, doi);
        debug!(url = %url, "Querying OpenCitations");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.access_token {
            request = request.header("authorization", token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::rate_limited(&response));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                message: format!("OpenCitations API error: {}", status),
            });
        }

        let body = response.text().await?;
        parse_citations(&body)
    }
}

#[async_trait]
impl CitationIndex for OpenCitationsClient {
    async fn resolve_citations(&self, doi: &str) -> Result<Vec<String>> {
        let citing = self.fetch(doi).await.map_err(|source| CiteGenderError::Lookup {
            doi: doi.to_string(),
            source,
        })?;

        if citing.is_empty() {
            debug!(doi = doi, "No citations listed");
        } else {
            info!(doi = doi, count = citing.len(), "Found citing DOIs");
        }
        Ok(citing)
    }
}

/// Citations URL of `doi`.
///
/// Each `/`-separated part of the DOI is percent-encoded so that `#`, `?` and
/// `%` stay in the path.
fn citations_url(base: &Url, doi: &str) -> String {
    let encoded: Vec<_> = doi.split('/').map(urlencoding::encode).collect();
    endpoint(base, &format!("{}/{}", CITATIONS_PATH, encoded.join("/")))
}

#[derive(Debug, Deserialize)]
struct CitationEntry {
    citing: String,
}

/// Parse a COCI citations body into citing DOIs, keeping upstream order
fn parse_citations(body: &str) -> std::result::Result<Vec<String>, FetchError> {
    let entries: Vec<CitationEntry> = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("OpenCitations response: {}", e)))?;
    Ok(entries.into_iter().map(|e| e.citing).collect())
}
