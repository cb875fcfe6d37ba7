//! Traits for the external services the pipeline talks to.
//!
//! Each trait has one production implementation
//! ([`OpenCitationsClient`](crate::opencitations::OpenCitationsClient),
//! [`CrossrefClient`](crate::crossref::CrossrefClient),
//! [`GenderApiClient`](crate::genderapi::GenderApiClient)); tests swap in
//! deterministic fakes.

use crate::crossref::AuthorPair;
use crate::error::Result;
use crate::genderapi::GenderGuess;
use async_trait::async_trait;

/// Resolves the DOIs of works citing a DOI.
#[async_trait]
pub trait CitationIndex: Send + Sync {
    /// Citing DOIs in upstream order; empty when nothing cites `doi`.
    ///
    /// Errors are [`CiteGenderError::Lookup`](crate::CiteGenderError::Lookup).
    async fn resolve_citations(&self, doi: &str) -> Result<Vec<String>>;
}

/// Resolves the first and last author of a DOI.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Positionally first and last author; both empty when unknown.
    ///
    /// Errors are [`CiteGenderError::Resolution`](crate::CiteGenderError::Resolution).
    async fn resolve_authors(&self, doi: &str) -> Result<AuthorPair>;
}

/// Guesses a gender category from a first name.
#[async_trait]
pub trait GenderInference: Send + Sync {
    /// An empty name yields [`GenderGuess::unknown`].
    ///
    /// Errors are [`CiteGenderError::Inference`](crate::CiteGenderError::Inference).
    async fn infer_gender(&self, name: &str) -> Result<GenderGuess>;
}
