//! Run configuration: cited works, service endpoints and credentials.

use crate::error::{CiteGenderError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Service endpoints and request limits.
pub mod api {
    use std::time::Duration;

    /// OpenCitations base URL (COCI index lives under `/index/coci/api/v1`)
    pub const OPENCITATIONS_URL: &str = "https://opencitations.net";

    /// Crossref REST API base URL
    pub const CROSSREF_URL: &str = "https://api.crossref.org";

    /// gender-api.com base URL
    pub const GENDER_API_URL: &str = "https://gender-api.com";

    /// Polite pool email for Crossref
    pub const MAILTO: &str = "citegender@example.com";

    /// Per-request timeout
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Minimum spacing between gender-api calls (4 req/s)
    pub const GENDER_MIN_INTERVAL: Duration = Duration::from_millis(250);
}

/// Default output file, relative to the working directory
pub const DEFAULT_OUTPUT: &str = "data/citing_papers.csv";

/// A work whose citing papers are collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedWork {
    /// Entity tag, e.g. "paper", "preprint", "code"
    pub label: String,
    /// DOI of the cited work
    pub doi: String,
}

impl CitedWork {
    /// Create a cited work, validating the DOI
    pub fn new(label: impl Into<String>, doi: impl Into<String>) -> Result<Self> {
        let label = label.into().trim().to_string();
        let doi = doi.into().trim().to_string();
        if label.is_empty() {
            return Err(CiteGenderError::Validation(format!(
                "cited work {doi} has an empty label"
            )));
        }
        validate_doi(&doi)?;
        Ok(Self { label, doi })
    }

    /// Parse a `label=DOI` pair as given on the command line
    pub fn parse_pair(pair: &str) -> Result<Self> {
        let (label, doi) = pair.split_once('=').ok_or_else(|| {
            CiteGenderError::Validation(format!("expected label=DOI, got {pair:?}"))
        })?;
        Self::new(label, doi)
    }
}

/// The three works studied by default.
pub fn default_cited_works() -> Vec<CitedWork> {
    [
        ("paper", "10.1038/s41593-020-0658-y"),
        ("preprint", "10.1101/2020.01.03.894378"),
        ("code", "10.5281/zenodo.3672109"),
    ]
    .into_iter()
    .map(|(label, doi)| CitedWork {
        label: label.to_string(),
        doi: doi.to_string(),
    })
    .collect()
}

/// Load cited works from a JSON array of `{"label": ..., "doi": ...}`.
///
/// Order in the file is the processing order.
pub fn load_cited_works(path: &Path) -> Result<Vec<CitedWork>> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<CitedWork> = serde_json::from_str(&content)?;
    if raw.is_empty() {
        return Err(CiteGenderError::Config(format!(
            "no cited works in {}",
            path.display()
        )));
    }
    raw.into_iter()
        .map(|w| CitedWork::new(w.label, w.doi))
        .collect()
}

/// Check that a string looks like a DOI (`10.<registrant>/<suffix>`).
pub fn validate_doi(doi: &str) -> Result<()> {
    static DOI_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = DOI_RE.get_or_init(|| Regex::new(r"^10\.\d+(\.\d+)*/\S+$").ok());
    match re {
        Some(re) if re.is_match(doi) => Ok(()),
        Some(_) => Err(CiteGenderError::Validation(format!("not a DOI: {doi:?}"))),
        None => Err(CiteGenderError::Config("DOI pattern failed to compile".to_string())),
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Works whose citing papers are collected, in processing order
    pub cited_works: Vec<CitedWork>,
    /// OpenCitations base URL
    pub opencitations_url: Url,
    /// Optional OpenCitations access token
    pub opencitations_token: Option<String>,
    /// Crossref base URL
    pub crossref_url: Url,
    /// Email sent to Crossref for the polite pool
    pub mailto: String,
    /// gender-api base URL
    pub gender_api_url: Url,
    /// gender-api key; only the gender client needs it
    pub gender_api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Minimum spacing between gender-api calls
    pub gender_min_interval: Duration,
}

impl Config {
    /// Configuration for the public services with the given key
    pub fn new(gender_api_key: impl Into<String>) -> Result<Self> {
        let gender_api_key = gender_api_key.into();
        if gender_api_key.trim().is_empty() {
            return Err(CiteGenderError::Config(
                "gender-api key is empty (set GENDER_API_KEY)".to_string(),
            ));
        }
        let mut config = Self::without_gender_key()?;
        config.gender_api_key = Some(gender_api_key.trim().to_string());
        Ok(config)
    }

    /// Configuration for the public services, without a gender-api key.
    ///
    /// Enough for citation and author lookups; building a
    /// [`GenderApiClient`](crate::genderapi::GenderApiClient) from it fails.
    pub fn without_gender_key() -> Result<Self> {
        Ok(Self {
            cited_works: default_cited_works(),
            opencitations_url: parse_base_url(api::OPENCITATIONS_URL)?,
            opencitations_token: None,
            crossref_url: parse_base_url(api::CROSSREF_URL)?,
            mailto: api::MAILTO.to_string(),
            gender_api_url: parse_base_url(api::GENDER_API_URL)?,
            gender_api_key: None,
            timeout: api::REQUEST_TIMEOUT,
            gender_min_interval: api::GENDER_MIN_INTERVAL,
        })
    }

    /// Point every service at one mock server
    pub fn for_testing(base_uri: &str) -> Result<Self> {
        let base = parse_base_url(base_uri)?;
        let mut config = Self::new("test-key")?;
        config.opencitations_url = base.clone();
        config.crossref_url = base.clone();
        config.gender_api_url = base;
        config.timeout = Duration::from_secs(5);
        config.gender_min_interval = Duration::ZERO;
        Ok(config)
    }

    /// Replace the cited works
    pub fn with_cited_works(mut self, works: Vec<CitedWork>) -> Result<Self> {
        if works.is_empty() {
            return Err(CiteGenderError::Config("no cited works configured".to_string()));
        }
        self.cited_works = works;
        Ok(self)
    }
}

/// Parse a service base URL, dropping any trailing slash
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| CiteGenderError::Config(format!("invalid base URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CiteGenderError::Config(format!("not a base URL: {raw:?}")));
    }
    Ok(url)
}

/// Join a path onto a base URL as plain text.
///
/// DOIs contain `/` that must stay literal, so `Url::join` is not used.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}
