//! gender-api.com client.
//!
//! Guesses a gender category and an accuracy percentage from a first name.
//! Calls are spaced by a minimum interval so the per-second quota is never
//! exceeded; quota exhaustion is reported as an error, never as "unknown".

use crate::config::{endpoint, Config};
use crate::error::{CiteGenderError, FetchError, Result};
use crate::sources::GenderInference;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Lookup endpoint, relative to the gender-api base URL
const GET_PATH: &str = "/get";

/// gender-api error number for an exhausted request quota
const ERRNO_LIMIT_REACHED: i64 = 30;

/// Gender category reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        })
    }
}

/// A gender guess with its reported accuracy in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenderGuess {
    pub gender: Gender,
    /// 0..=100
    pub accuracy: u8,
}

impl GenderGuess {
    pub fn new(gender: Gender, accuracy: u8) -> Self {
        Self {
            gender,
            accuracy: accuracy.min(100),
        }
    }

    /// Result for a name that could not be resolved
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Enforces a minimum spacing between consecutive requests
pub struct RequestSpacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous call
    pub async fn wait(&self) {
        let remaining = {
            let last = self.last_request.lock().ok();
            last.and_then(|l| *l)
                .map(|t| self.min_interval.saturating_sub(t.elapsed()))
                .unwrap_or_default()
        };

        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }

        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
    }
}

/// gender-api.com client with request spacing
pub struct GenderApiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: Url,
    spacer: RequestSpacer,
}

impl GenderApiClient {
    /// Create a new GenderApiClient from the run configuration.
    ///
    /// Fails when the configuration carries no gender-api key.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.gender_api_key.clone().ok_or_else(|| {
            CiteGenderError::Config("gender-api key is missing (set GENDER_API_KEY)".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CiteGenderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: config.gender_api_url.clone(),
            spacer: RequestSpacer::new(config.gender_min_interval),
        })
    }

    /// Internal request implementation
    async fn do_request(&self, name: &str) -> std::result::Result<GenderGuess, FetchError> {
        self.spacer.wait().await;
        debug!(name = name, "Querying gender-api");

        let response = self
            .client
            .get(endpoint(&self.base_url, GET_PATH))
            .query(&[("key", self.api_key.as_str()), ("name", name)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::rate_limited(&response));
        }

        if !response.status().is_success() {
            warn!(
                name = name,
                status = response.status().as_u16(),
                "gender-api error"
            );
            return Err(FetchError::Status {
                code: response.status().as_u16(),
                message: format!("gender-api error: {}", response.status()),
            });
        }

        let body = response.text().await?;
        parse_guess(&body)
    }
}

#[async_trait]
impl GenderInference for GenderApiClient {
    async fn infer_gender(&self, name: &str) -> Result<GenderGuess> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(GenderGuess::unknown());
        }

        self.do_request(name)
            .await
            .map_err(|source| CiteGenderError::Inference {
                name: name.to_string(),
                source,
            })
    }
}

// === gender-api Response Types ===

#[derive(Debug, Deserialize)]
struct GenderApiResponse {
    #[serde(default)]
    errno: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    accuracy: Option<i64>,
}

/// Decode a gender-api body, turning error bodies into errors
fn parse_guess(body: &str) -> std::result::Result<GenderGuess, FetchError> {
    let data: GenderApiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("gender-api response: {}", e)))?;

    if let Some(errno) = data.errno.filter(|&n| n != 0) {
        let message = data.errmsg.unwrap_or_else(|| "Unknown".to_string());
        return Err(if errno == ERRNO_LIMIT_REACHED {
            FetchError::Quota(message)
        } else {
            FetchError::Api {
                code: errno,
                message,
            }
        });
    }

    let gender = data
        .gender
        .ok_or_else(|| FetchError::Parse("gender-api response has no gender".to_string()))?;
    let accuracy = data.accuracy.unwrap_or(0).clamp(0, 100) as u8;

    Ok(GenderGuess::new(gender, accuracy))
}
