//! Pipeline tests: fake sources for ordering and failure handling, and one
//! end-to-end run against mocked services.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use citegender::config::{CitedWork, Config};
use citegender::crossref::{Author, AuthorPair, CrossrefClient};
use citegender::error::{FetchError, Stage};
use citegender::genderapi::{Gender, GenderApiClient, GenderGuess};
use citegender::opencitations::OpenCitationsClient;
use citegender::pipeline::Pipeline;
use citegender::sources::{CitationIndex, GenderInference, MetadataIndex};
use citegender::{CiteGenderError, Result};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeCitations {
    citing: HashMap<String, Vec<String>>,
    failing: Vec<String>,
}

impl FakeCitations {
    fn with(mut self, cited: &str, citing: &[&str]) -> Self {
        self.citing
            .insert(cited.to_string(), citing.iter().map(|s| s.to_string()).collect());
        self
    }

    fn failing(mut self, cited: &str) -> Self {
        self.failing.push(cited.to_string());
        self
    }
}

#[async_trait]
impl CitationIndex for FakeCitations {
    async fn resolve_citations(&self, doi: &str) -> Result<Vec<String>> {
        if self.failing.iter().any(|d| d == doi) {
            return Err(CiteGenderError::Lookup {
                doi: doi.to_string(),
                source: FetchError::Status {
                    code: 500,
                    message: "down".to_string(),
                },
            });
        }
        Ok(self.citing.get(doi).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeMetadata {
    authors: HashMap<String, Vec<Author>>,
    failing: Vec<String>,
}

impl FakeMetadata {
    fn with(mut self, doi: &str, given: &[Option<&str>]) -> Self {
        let authors = given
            .iter()
            .map(|g| Author {
                given: g.map(str::to_string),
                ..Default::default()
            })
            .collect();
        self.authors.insert(doi.to_string(), authors);
        self
    }

    fn failing(mut self, doi: &str) -> Self {
        self.failing.push(doi.to_string());
        self
    }
}

#[async_trait]
impl MetadataIndex for FakeMetadata {
    async fn resolve_authors(&self, doi: &str) -> Result<AuthorPair> {
        if self.failing.iter().any(|d| d == doi) {
            return Err(CiteGenderError::Resolution {
                doi: doi.to_string(),
                source: FetchError::Parse("bad body".to_string()),
            });
        }
        Ok(self
            .authors
            .get(doi)
            .map(|a| AuthorPair::from_authors(a))
            .unwrap_or_default())
    }
}

/// Fixed guesses per name; unknown names get `GenderGuess::unknown()`
#[derive(Default)]
struct FakeGender {
    guesses: HashMap<String, GenderGuess>,
    quota_exceeded_for: Vec<String>,
}

impl FakeGender {
    fn with(mut self, name: &str, gender: Gender, accuracy: u8) -> Self {
        self.guesses
            .insert(name.to_string(), GenderGuess::new(gender, accuracy));
        self
    }

    fn quota_exceeded_for(mut self, name: &str) -> Self {
        self.quota_exceeded_for.push(name.to_string());
        self
    }
}

#[async_trait]
impl GenderInference for FakeGender {
    async fn infer_gender(&self, name: &str) -> Result<GenderGuess> {
        if self.quota_exceeded_for.iter().any(|n| n == name) {
            return Err(CiteGenderError::Inference {
                name: name.to_string(),
                source: FetchError::Quota("limit reached".to_string()),
            });
        }
        Ok(self.guesses.get(name).copied().unwrap_or_default())
    }
}

fn work(label: &str, doi: &str) -> CitedWork {
    CitedWork::new(label, doi).unwrap()
}

// =============================================================================
// Record builder
// =============================================================================

#[tokio::test]
async fn test_build_record_normalizes_names() {
    let pipeline = Pipeline::new(
        FakeCitations::default(),
        FakeMetadata::default().with("10.0/A", &[Some("Jane Ann"), Some("B."), Some("J. D.")]),
        FakeGender::default()
            .with("Jane", Gender::Female, 97)
            .with("J", Gender::Male, 60),
    );

    let record = pipeline
        .build_record("10.0/A", &work("paper", "10.0/X"))
        .await
        .unwrap();

    assert_eq!(record.first_author_name, "Jane");
    assert_eq!(record.first_author_gender, Gender::Female);
    assert_eq!(record.first_author_gender_accuracy, 97);
    assert_eq!(record.last_author_name, "J");
    assert_eq!(record.last_author_gender, Gender::Male);
    assert_eq!(record.last_author_gender_accuracy, 60);
    assert_eq!(record.cited_entity, "paper");
    assert_eq!(record.cited_doi, "10.0/X");
}

#[tokio::test]
async fn test_build_record_reports_failed_stage() {
    let pipeline = Pipeline::new(
        FakeCitations::default(),
        FakeMetadata::default()
            .with("10.0/A", &[Some("Jane"), Some("Kim")])
            .failing("10.0/B"),
        FakeGender::default()
            .with("Jane", Gender::Female, 97)
            .quota_exceeded_for("Kim"),
    );
    let cited = work("paper", "10.0/X");

    let failure = pipeline.build_record("10.0/A", &cited).await.unwrap_err();
    assert_eq!(failure.citing_doi, "10.0/A");
    assert_eq!(failure.stage, Stage::InferLastAuthor);

    let failure = pipeline.build_record("10.0/B", &cited).await.unwrap_err();
    assert_eq!(failure.stage, Stage::ResolveAuthors);
    assert!(matches!(failure.source, CiteGenderError::Resolution { .. }));
}

#[tokio::test]
async fn test_unknown_work_gives_empty_names() {
    let gender = FakeGender::default();
    let pipeline = Pipeline::new(FakeCitations::default(), FakeMetadata::default(), gender);

    let record = pipeline
        .build_record("10.0/unknown", &work("paper", "10.0/X"))
        .await
        .unwrap();

    assert_eq!(record.first_author_name, "");
    assert_eq!(record.last_author_name, "");
    assert_eq!(record.first_author_gender, Gender::Unknown);
    assert_eq!(record.last_author_gender_accuracy, 0);
}

// =============================================================================
// Dataset accumulation
// =============================================================================

#[tokio::test]
async fn test_dataset_order_and_tags() {
    let pipeline = Pipeline::new(
        FakeCitations::default()
            .with("10.1/paper", &["10.9/c", "10.9/a"])
            .with("10.1/preprint", &["10.9/a", "10.9/b"]),
        FakeMetadata::default()
            .with("10.9/a", &[Some("Ada")])
            .with("10.9/b", &[Some("Bo")])
            .with("10.9/c", &[Some("Cy")]),
        FakeGender::default(),
    );
    let works = [work("paper", "10.1/paper"), work("preprint", "10.1/preprint")];

    let report = pipeline.build_dataset(&works).await;

    let rows: Vec<(&str, &str)> = report
        .dataset
        .iter()
        .map(|r| (r.cited_entity.as_str(), r.doi.as_str()))
        .collect();
    // 10.9/a cites both works and appears once per work
    assert_eq!(
        rows,
        [
            ("paper", "10.9/c"),
            ("paper", "10.9/a"),
            ("preprint", "10.9/a"),
            ("preprint", "10.9/b"),
        ]
    );
    for record in report.dataset.iter() {
        let cited = works.iter().find(|w| w.label == record.cited_entity).unwrap();
        assert_eq!(record.cited_doi, cited.doi);
    }
}

#[tokio::test]
async fn test_repeated_citing_doi_gives_one_row_per_work() {
    let pipeline = Pipeline::new(
        FakeCitations::default()
            .with("10.1/paper", &["10.9/a", "10.9/b", "10.9/a", "10.9/A"])
            .with("10.1/preprint", &["10.9/a"]),
        FakeMetadata::default()
            .with("10.9/a", &[Some("Ada")])
            .with("10.9/b", &[Some("Bo")]),
        FakeGender::default(),
    );
    let works = [work("paper", "10.1/paper"), work("preprint", "10.1/preprint")];

    let report = pipeline.build_dataset(&works).await;

    let rows: Vec<(&str, &str)> = report
        .dataset
        .iter()
        .map(|r| (r.cited_entity.as_str(), r.doi.as_str()))
        .collect();
    assert_eq!(
        rows,
        [
            ("paper", "10.9/a"),
            ("paper", "10.9/b"),
            ("preprint", "10.9/a"),
        ]
    );
    assert_eq!(report.summary.works[0].citing, 2);
    assert_eq!(report.summary.works[0].duplicates, 2);
    assert_eq!(report.summary.works[1].duplicates, 0);
    assert_eq!(report.summary.attempted(), 3);
}

#[tokio::test]
async fn test_work_without_citations_contributes_no_rows() {
    let pipeline = Pipeline::new(
        FakeCitations::default()
            .with("10.1/paper", &["10.9/a", "10.9/b"])
            .with("10.1/preprint", &["10.9/c"])
            .with("10.1/code", &[]),
        FakeMetadata::default()
            .with("10.9/a", &[Some("Ada")])
            .failing("10.9/b")
            .with("10.9/c", &[Some("Cy")]),
        FakeGender::default(),
    );
    let works = [
        work("paper", "10.1/paper"),
        work("preprint", "10.1/preprint"),
        work("code", "10.1/code"),
    ];

    let report = pipeline.build_dataset(&works).await;

    assert_eq!(report.dataset.for_entity("code").count(), 0);
    assert_eq!(report.dataset.for_entity("paper").count(), 1);
    assert_eq!(report.dataset.for_entity("preprint").count(), 1);
    assert_eq!(report.dataset.len(), report.summary.built());
    assert_eq!(report.summary.attempted(), 3);
    assert_eq!(report.summary.skipped(), 1);
    assert_eq!(report.summary.works[2].citing, 0);
    assert!(report.summary.works[2].lookup_error.is_none());
}

#[tokio::test]
async fn test_lookup_failure_skips_only_that_work() {
    let pipeline = Pipeline::new(
        FakeCitations::default()
            .failing("10.1/paper")
            .with("10.1/preprint", &["10.9/a"]),
        FakeMetadata::default().with("10.9/a", &[Some("Ada")]),
        FakeGender::default().with("Ada", Gender::Female, 99),
    );
    let works = [work("paper", "10.1/paper"), work("preprint", "10.1/preprint")];

    let report = pipeline.build_dataset(&works).await;

    assert_eq!(report.dataset.len(), 1);
    assert_eq!(report.dataset.records()[0].cited_entity, "preprint");
    let failed: Vec<_> = report.summary.failed_works().map(|w| w.label.as_str()).collect();
    assert_eq!(failed, ["paper"]);
}

#[tokio::test]
async fn test_gender_failure_skips_doi_and_continues() {
    let gender = FakeGender::default()
        .with("Ada", Gender::Female, 99)
        .quota_exceeded_for("Bo");
    let pipeline = Pipeline::new(
        FakeCitations::default().with("10.1/paper", &["10.9/a", "10.9/b", "10.9/c"]),
        FakeMetadata::default()
            .with("10.9/a", &[Some("Ada")])
            .with("10.9/b", &[Some("Bo")])
            .with("10.9/c", &[Some("Ada"), None]),
        gender,
    );

    let report = pipeline.build_dataset(&[work("paper", "10.1/paper")]).await;

    let dois: Vec<_> = report.dataset.iter().map(|r| r.doi.as_str()).collect();
    assert_eq!(dois, ["10.9/a", "10.9/c"]);
    assert_eq!(report.summary.skipped(), 1);
    assert_eq!(report.dataset.records()[1].last_author_name, "");
}

// =============================================================================
// End to end against mocked services
// =============================================================================

#[tokio::test]
async fn test_end_to_end_with_mocked_services() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index/coci/api/v1/citations/10.0/X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"citing": "10.0/A", "cited": "10.0/X"},
            {"citing": "10.0/B", "cited": "10.0/X"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "doi:10.0/A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "total-results": 1,
                "items": [{"DOI": "10.0/A", "author": [{"given": "Jane", "family": "Doe", "sequence": "first"}]}]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "doi:10.0/B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"total-results": 1, "items": [{"DOI": "10.0/B"}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get"))
        .and(query_param("name", "Jane"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"gender": "male", "accuracy": 95})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = Config::for_testing(&server.uri())
        .unwrap()
        .with_cited_works(vec![work("paper", "10.0/X")])
        .unwrap();
    let pipeline = Pipeline::new(
        OpenCitationsClient::new(&config).unwrap(),
        CrossrefClient::new(&config).unwrap(),
        GenderApiClient::new(&config).unwrap(),
    );

    let report = pipeline.build_dataset(&config.cited_works).await;
    let rows = report.dataset.records();

    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].doi, "10.0/A");
    assert_eq!(rows[0].first_author_name, "Jane");
    assert_eq!(rows[0].first_author_gender, Gender::Male);
    assert_eq!(rows[0].first_author_gender_accuracy, 95);
    // single author: last == first
    assert_eq!(rows[0].last_author_name, "Jane");

    assert_eq!(rows[1].doi, "10.0/B");
    assert_eq!(rows[1].first_author_name, "");
    assert_eq!(rows[1].first_author_gender, Gender::Unknown);
    assert_eq!(rows[1].first_author_gender_accuracy, 0);
    assert_eq!(rows[1].last_author_gender, Gender::Unknown);

    for row in &report.dataset {
        assert_eq!(row.cited_entity, "paper");
        assert_eq!(row.cited_doi, "10.0/X");
    }
    assert_eq!(report.summary.skipped(), 0);
}
