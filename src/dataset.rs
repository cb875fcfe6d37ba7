//! Citing-paper records and the dataset they are accumulated into.
//!
//! The dataset keeps insertion order (cited work, then citing DOI) and is
//! written once, as CSV, at the end of a run.

use crate::config::CitedWork;
use crate::error::Result;
use crate::genderapi::{Gender, GenderGuess};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One citing paper with first/last author gender guesses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitingRecord {
    pub doi: String,
    pub first_author_name: String,
    pub first_author_gender: Gender,
    pub first_author_gender_accuracy: u8,
    pub last_author_name: String,
    pub last_author_gender: Gender,
    pub last_author_gender_accuracy: u8,
    pub cited_entity: String,
    pub cited_doi: String,
}

impl CitingRecord {
    /// Assemble a record for `citing_doi` tagged with the cited work
    pub fn new(
        citing_doi: &str,
        cited: &CitedWork,
        first: (String, GenderGuess),
        last: (String, GenderGuess),
    ) -> Self {
        let (first_author_name, first_guess) = first;
        let (last_author_name, last_guess) = last;
        Self {
            doi: citing_doi.to_string(),
            first_author_name,
            first_author_gender: first_guess.gender,
            first_author_gender_accuracy: first_guess.accuracy,
            last_author_name,
            last_author_gender: last_guess.gender,
            last_author_gender_accuracy: last_guess.accuracy,
            cited_entity: cited.label.clone(),
            cited_doi: cited.doi.clone(),
        }
    }
}

/// CSV column order
pub const CSV_COLUMNS: &[&str] = &[
    "doi",
    "first_author_name",
    "first_author_gender",
    "first_author_gender_accuracy",
    "last_author_name",
    "last_author_gender",
    "last_author_gender_accuracy",
    "cited_entity",
    "cited_doi",
];

/// Ordered, append-only collection of citing records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<CitingRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end
    pub fn push(&mut self, record: CitingRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CitingRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CitingRecord> {
        self.records.iter()
    }

    /// Records tagged with the given cited entity
    pub fn for_entity<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a CitingRecord> + 'a {
        self.records.iter().filter(move |r| r.cited_entity == label)
    }

    /// Write the dataset as CSV to any writer.
    ///
    /// The header row is written even when there are no records.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        wtr.write_record(CSV_COLUMNS)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Save the dataset to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(file)?;
        info!(path = %path.display(), rows = self.len(), "Saved dataset");
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a CitingRecord;
    type IntoIter = std::slice::Iter<'a, CitingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
