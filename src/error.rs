//! Custom error types for citegender.
//!
//! Failures are grouped by the external service that produced them:
//! the citation index ([`CiteGenderError::Lookup`]), the metadata index
//! ([`CiteGenderError::Resolution`]) and the gender service
//! ([`CiteGenderError::Inference`]). The transport-level cause of each is a
//! [`FetchError`].

use thiserror::Error;

/// Transport or decoding failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network/HTTP request error (includes timeouts)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Status text or response body excerpt
        message: String,
    },

    /// Error reported in the body of an otherwise successful response
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from API
        code: i64,
        /// Error message from API
        message: String,
    },

    /// Rate limited by the remote API
    #[error("rate limited{}", .0.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited(Option<u64>),

    /// Request quota exhausted (reported in the response body)
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Rate-limit error carrying the `Retry-After` seconds, if given
    pub(crate) fn rate_limited(response: &reqwest::Response) -> Self {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        FetchError::RateLimited(retry_after)
    }
}

/// Main error type for citegender operations.
#[derive(Debug, Error)]
pub enum CiteGenderError {
    /// Citation index unreachable or unparsable
    #[error("citation lookup failed for {doi}: {source}")]
    Lookup {
        /// Cited DOI whose citations were requested
        doi: String,
        #[source]
        source: FetchError,
    },

    /// Metadata index unreachable or unparsable
    #[error("author resolution failed for {doi}: {source}")]
    Resolution {
        /// DOI whose authors were requested
        doi: String,
        #[source]
        source: FetchError,
    },

    /// Gender service unreachable, unparsable or out of quota
    #[error("gender inference failed for {name:?}: {source}")]
    Inference {
        /// First name sent to the service
        name: String,
        #[source]
        source: FetchError,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `CiteGenderError`
pub type Result<T> = std::result::Result<T, CiteGenderError>;

/// Stage of the per-DOI record builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Looking up first/last author in the metadata index
    ResolveAuthors,
    /// Guessing the gender of the first author
    InferFirstAuthor,
    /// Guessing the gender of the last author
    InferLastAuthor,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ResolveAuthors => "resolve authors",
            Stage::InferFirstAuthor => "infer first author gender",
            Stage::InferLastAuthor => "infer last author gender",
        };
        f.write_str(name)
    }
}

/// A single citing DOI that could not be turned into a record.
#[derive(Debug, Error)]
#[error("{citing_doi}: {stage} failed: {source}")]
pub struct RecordFailure {
    /// Citing DOI being processed
    pub citing_doi: String,
    /// Stage that failed
    pub stage: Stage,
    #[source]
    pub source: CiteGenderError,
}
