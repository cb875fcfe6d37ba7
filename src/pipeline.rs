//! Citation -> author -> gender pipeline.
//!
//! For every cited work the citing DOIs are listed, then each citing DOI is
//! turned into a [`CitingRecord`] one call at a time. A DOI that fails is
//! skipped with a warning; a cited work whose citation list cannot be fetched
//! is skipped as a whole. Neither aborts the run.

use crate::config::CitedWork;
use crate::dataset::{CitingRecord, Dataset};
use crate::error::{CiteGenderError, RecordFailure, Stage};
use crate::names::extract_first_name;
use crate::sources::{CitationIndex, GenderInference, MetadataIndex};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Per cited work counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSummary {
    pub label: String,
    pub doi: String,
    /// Distinct citing DOIs listed by the citation index
    pub citing: usize,
    /// Repeated citing DOIs dropped from the listing
    pub duplicates: usize,
    /// Records added to the dataset
    pub built: usize,
    /// Citing DOIs skipped after a failure
    pub skipped: usize,
    /// Citation lookup error, when the whole work was skipped
    pub lookup_error: Option<String>,
}

/// Outcome counts of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub works: Vec<WorkSummary>,
}

impl RunSummary {
    /// Citing DOIs for which a record was attempted
    pub fn attempted(&self) -> usize {
        self.works.iter().map(|w| w.citing).sum()
    }

    pub fn built(&self) -> usize {
        self.works.iter().map(|w| w.built).sum()
    }

    pub fn skipped(&self) -> usize {
        self.works.iter().map(|w| w.skipped).sum()
    }

    /// Cited works whose citation list could not be fetched
    pub fn failed_works(&self) -> impl Iterator<Item = &WorkSummary> {
        self.works.iter().filter(|w| w.lookup_error.is_some())
    }
}

/// Dataset plus the summary of how it was built
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: Dataset,
    pub summary: RunSummary,
}

/// The pipeline over one citation index, one metadata index and one gender
/// inference backend.
pub struct Pipeline<C, M, G> {
    citations: C,
    metadata: M,
    gender: G,
}

impl<C, M, G> Pipeline<C, M, G>
where
    C: CitationIndex,
    M: MetadataIndex,
    G: GenderInference,
{
    pub fn new(citations: C, metadata: M, gender: G) -> Self {
        Self {
            citations,
            metadata,
            gender,
        }
    }

    /// Build the record of one citing DOI.
    ///
    /// Authors are resolved, their first names extracted and a gender guessed
    /// for each, in that order. The first failing stage is reported.
    pub async fn build_record(
        &self,
        citing_doi: &str,
        cited: &CitedWork,
    ) -> std::result::Result<CitingRecord, RecordFailure> {
        let fail = |stage: Stage| {
            move |source: CiteGenderError| RecordFailure {
                citing_doi: citing_doi.to_string(),
                stage,
                source,
            }
        };

        let authors = self
            .metadata
            .resolve_authors(citing_doi)
            .await
            .map_err(fail(Stage::ResolveAuthors))?;

        let first_name = extract_first_name(&authors.first);
        let last_name = extract_first_name(&authors.last);

        let first_guess = self
            .gender
            .infer_gender(&first_name)
            .await
            .map_err(fail(Stage::InferFirstAuthor))?;
        let last_guess = self
            .gender
            .infer_gender(&last_name)
            .await
            .map_err(fail(Stage::InferLastAuthor))?;

        Ok(CitingRecord::new(
            citing_doi,
            cited,
            (first_name, first_guess),
            (last_name, last_guess),
        ))
    }

    /// Run the pipeline over `cited_works` in order.
    pub async fn build_dataset(&self, cited_works: &[CitedWork]) -> RunReport {
        let started_at = Local::now();
        let mut dataset = Dataset::new();
        let mut works = Vec::with_capacity(cited_works.len());

        for cited in cited_works {
            info!(entity = %cited.label, doi = %cited.doi, "Looking for citations");
            let summary = self.collect_work(cited, &mut dataset).await;
            works.push(summary);
        }

        let summary = RunSummary {
            started_at,
            finished_at: Local::now(),
            works,
        };
        info!(
            attempted = summary.attempted(),
            built = summary.built(),
            skipped = summary.skipped(),
            "Pipeline finished"
        );

        RunReport { dataset, summary }
    }

    /// Append the records of one cited work to `dataset`
    async fn collect_work(&self, cited: &CitedWork, dataset: &mut Dataset) -> WorkSummary {
        let mut summary = WorkSummary {
            label: cited.label.clone(),
            doi: cited.doi.clone(),
            citing: 0,
            duplicates: 0,
            built: 0,
            skipped: 0,
            lookup_error: None,
        };

        let citing_dois = match self.citations.resolve_citations(&cited.doi).await {
            Ok(dois) => dois,
            Err(e) => {
                warn!(entity = %cited.label, error = %e, "Skipping cited work");
                summary.lookup_error = Some(e.to_string());
                return summary;
            }
        };

        let listed = citing_dois.len();
        let citing_dois = distinct_dois(citing_dois);
        summary.citing = citing_dois.len();
        summary.duplicates = listed - citing_dois.len();
        if summary.duplicates > 0 {
            debug!(
                entity = %cited.label,
                duplicates = summary.duplicates,
                "Dropped repeated citing DOIs"
            );
        }
        if citing_dois.is_empty() {
            info!(entity = %cited.label, "No citations found");
            return summary;
        }

        let total = citing_dois.len();
        for (idx, citing_doi) in citing_dois.iter().enumerate() {
            info!(
                entity = %cited.label,
                progress = %format!("{}/{}", idx + 1, total),
                doi = %citing_doi,
                "Resolving citing paper"
            );
            match self.build_record(citing_doi, cited).await {
                Ok(record) => {
                    dataset.push(record);
                    summary.built += 1;
                }
                Err(failure) => {
                    warn!(
                        doi = %failure.citing_doi,
                        stage = %failure.stage,
                        error = %failure.source,
                        "Skipping citing DOI"
                    );
                    summary.skipped += 1;
                }
            }
        }

        summary
    }
}

/// Drop repeated DOIs, keeping the first occurrence. DOIs compare
/// case-insensitively.
fn distinct_dois(dois: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(dois.len());
    dois.into_iter()
        .filter(|doi| seen.insert(doi.to_lowercase()))
        .collect()
}
