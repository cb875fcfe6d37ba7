//! # citegender
//!
//! Collects the papers citing a fixed set of works, guesses the gender of
//! each citing paper's first and last author from their first name, and
//! writes the result as CSV.
//!
//! ## Modules
//!
//! - [`opencitations`] - Citing DOIs from the OpenCitations COCI index
//! - [`crossref`] - First/last author lookup via the Crossref API
//! - [`names`] - First-name extraction
//! - [`genderapi`] - gender-api.com client
//! - [`pipeline`] - Record builder and dataset accumulation
//! - [`dataset`] - Records and CSV output
//! - [`config`] - Cited works, endpoints and credentials
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use citegender::{config::Config, crossref::CrossrefClient, genderapi::GenderApiClient,
//!     opencitations::OpenCitationsClient, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(std::env::var("GENDER_API_KEY")?)?;
//!     let pipeline = Pipeline::new(
//!         OpenCitationsClient::new(&config)?,
//!         CrossrefClient::new(&config)?,
//!         GenderApiClient::new(&config)?,
//!     );
//!     let report = pipeline.build_dataset(&config.cited_works).await;
//!     report.dataset.save("data/citing_papers.csv".as_ref())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crossref;
pub mod dataset;
pub mod error;
pub mod genderapi;
pub mod names;
pub mod opencitations;
pub mod pipeline;
pub mod sources;

pub use error::{CiteGenderError, Result};
