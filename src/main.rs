//! citegender - citing-paper author gender pipeline
//!
//! Lists the papers citing each configured work, resolves their first and
//! last authors via Crossref, guesses each author's gender with gender-api,
//! and saves one CSV row per citing paper.
//!
//! ## Usage
//!
//! ```bash
//! GENDER_API_KEY=... citegender fetch --output data/citing_papers.csv
//! citegender fetch --work paper=10.1038/s41593-020-0658-y --work code=10.5281/zenodo.3672109
//! citegender citations 10.1101/2020.01.03.894378
//! ```

use anyhow::{Context, Result};
use citegender::{
    config::{self, CitedWork, Config},
    crossref::CrossrefClient,
    genderapi::GenderApiClient,
    opencitations::OpenCitationsClient,
    pipeline::{Pipeline, RunSummary},
    sources::CitationIndex,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Citing-paper author gender pipeline
#[derive(Parser)]
#[command(name = "citegender")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect citing papers and author genders for the cited works
    Fetch {
        /// Cited work as label=DOI (repeatable, processed in order)
        #[arg(long = "work", value_name = "LABEL=DOI")]
        works: Vec<String>,

        /// JSON file with an array of {"label", "doi"} objects
        #[arg(long, conflicts_with = "works")]
        works_file: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// gender-api.com key
        #[arg(long, env = "GENDER_API_KEY", hide_env_values = true)]
        gender_api_key: String,

        /// Minimum milliseconds between gender-api requests
        #[arg(long, default_value = "250")]
        gender_interval_ms: u64,

        #[command(flatten)]
        endpoints: EndpointArgs,
    },

    /// List the DOIs citing a DOI
    Citations {
        /// Cited DOI
        doi: String,

        #[command(flatten)]
        endpoints: EndpointArgs,
    },
}

#[derive(Args)]
struct EndpointArgs {
    /// OpenCitations base URL
    #[arg(long, default_value = config::api::OPENCITATIONS_URL)]
    opencitations_url: String,

    /// OpenCitations access token
    #[arg(long, env = "OPENCITATIONS_ACCESS_TOKEN", hide_env_values = true)]
    opencitations_token: Option<String>,

    /// Crossref base URL
    #[arg(long, default_value = config::api::CROSSREF_URL)]
    crossref_url: String,

    /// gender-api base URL
    #[arg(long, default_value = config::api::GENDER_API_URL)]
    gender_api_url: String,

    /// Contact email for the Crossref polite pool
    #[arg(long, env = "CROSSREF_MAILTO", default_value = config::api::MAILTO)]
    mailto: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

impl EndpointArgs {
    fn apply(self, mut config: Config) -> Result<Config> {
        config.opencitations_url = config::parse_base_url(&self.opencitations_url)?;
        config.opencitations_token = self.opencitations_token.filter(|t| !t.trim().is_empty());
        config.crossref_url = config::parse_base_url(&self.crossref_url)?;
        config.gender_api_url = config::parse_base_url(&self.gender_api_url)?;
        config.mailto = self.mailto;
        config.timeout = Duration::from_secs(self.timeout_secs.max(1));
        Ok(config)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Fetch {
            works,
            works_file,
            output,
            gender_api_key,
            gender_interval_ms,
            endpoints,
        } => {
            let cited_works = resolve_cited_works(&works, works_file.as_deref())?;
            let mut config = endpoints
                .apply(Config::new(gender_api_key)?)?
                .with_cited_works(cited_works)?;
            config.gender_min_interval = Duration::from_millis(gender_interval_ms);
            run_fetch(config, output).await
        }
        Commands::Citations { doi, endpoints } => {
            config::validate_doi(&doi)?;
            let config = endpoints.apply(Config::without_gender_key()?)?;
            list_citations(&config, &doi).await
        }
    }
}

/// Pick cited works from --work pairs, a works file, or the defaults
fn resolve_cited_works(
    pairs: &[String],
    works_file: Option<&std::path::Path>,
) -> Result<Vec<CitedWork>> {
    if let Some(path) = works_file {
        return config::load_cited_works(path)
            .with_context(|| format!("Failed to load cited works from {}", path.display()));
    }
    if pairs.is_empty() {
        return Ok(config::default_cited_works());
    }
    pairs
        .iter()
        .map(|p| CitedWork::parse_pair(p).context("Invalid --work"))
        .collect()
}

// ============================================================================
// Fetch Pipeline
// ============================================================================

async fn run_fetch(config: Config, output: PathBuf) -> Result<()> {
    let pipeline = Pipeline::new(
        OpenCitationsClient::new(&config)?,
        CrossrefClient::new(&config)?,
        GenderApiClient::new(&config)?,
    );

    println!("Cited works:");
    for work in &config.cited_works {
        println!("  {:<10} {}", work.label, work.doi);
    }

    let report = pipeline.build_dataset(&config.cited_works).await;

    report
        .dataset
        .save(&output)
        .with_context(|| format!("Failed to save dataset to {}", output.display()))?;

    print_summary(&report.summary);
    println!("\n✓ Saved {} rows to {}", report.dataset.len(), output.display());
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n--- Summary ---");
    for work in &summary.works {
        match &work.lookup_error {
            Some(e) => println!("  {:<10} citation lookup failed: {}", work.label, e),
            None => println!(
                "  {:<10} {} citing, {} built, {} skipped",
                work.label, work.citing, work.built, work.skipped
            ),
        }
    }
    println!(
        "Attempted {} DOIs, skipped {} ({} cited works failed)",
        summary.attempted(),
        summary.skipped(),
        summary.failed_works().count()
    );
    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "Run {} -> {} ({}s)",
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        summary.finished_at.format("%H:%M:%S"),
        elapsed.num_seconds()
    );
}

// ============================================================================
// Citation Listing
// ============================================================================

async fn list_citations(config: &Config, doi: &str) -> Result<()> {
    let client = OpenCitationsClient::new(config)?;
    let citing = client.resolve_citations(doi).await?;

    if citing.is_empty() {
        println!("No citations found for {}", doi);
        return Ok(());
    }
    for citing_doi in &citing {
        println!("{}", citing_doi);
    }
    println!("\n{} citing DOIs", citing.len());
    Ok(())
}
