/// vizugy.hu chart page client.
///
/// The groundwater chart endpoint renders a full HTML page per well:
///   https://www.vizugy.hu/talajvizkut_grafikon/index.php?torzsszam=WELL_CODE
/// One request returns roughly a year of 4-hourly readings embedded as a
/// `chartView(...)` call; `ingest::chartview` does the extraction.
///
/// Fetching is behind the `PageFetcher` trait so the orchestrator can be
/// driven by a stub in tests. Only transient failures are retried —
/// structural parse failures are deterministic and handled downstream.

use std::fmt;
use std::time::Duration;

use crate::logging::{self, DataSource};

const VIZUGY_BASE_URL: &str = "https://www.vizugy.hu/talajvizkut_grafikon/index.php";

/// Per-request timeout. The PHP endpoint normally answers in a few seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Total attempts per well for transient failures (initial try + 1 retry).
const FETCH_ATTEMPTS: u32 = 2;

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-success HTTP status from the endpoint.
    Http(u16),
    /// Connection failure or timeout; retried up to the attempt budget.
    Transient(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(status) => write!(f, "HTTP {}", status),
            FetchError::Transient(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

// ---------------------------------------------------------------------------
// Page fetcher boundary
// ---------------------------------------------------------------------------

/// Boundary for retrieving one well's raw chart page.
pub trait PageFetcher {
    fn fetch_chart_page(&self, well_code: &str) -> Result<String, FetchError>;
}

/// Builds the chart page URL for a well code.
pub fn build_chart_url(well_code: &str) -> String {
    format!("{}?torzsszam={}", VIZUGY_BASE_URL, well_code)
}

// ---------------------------------------------------------------------------
// Live client
// ---------------------------------------------------------------------------

pub struct VizugyFetcher {
    client: reqwest::blocking::Client,
}

impl VizugyFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            // The endpoint serves the same page to browsers and scripts, but
            // a browser UA avoids the occasional bot-filter rejection.
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .build()?;
        Ok(VizugyFetcher { client })
    }

    fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.is_server_error() {
                // 5xx is worth another attempt; 4xx is not.
                return Err(FetchError::Transient(format!("HTTP {}", status.as_u16())));
            }
            return Err(FetchError::Http(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| FetchError::Transient(e.to_string()))
    }
}

impl PageFetcher for VizugyFetcher {
    fn fetch_chart_page(&self, well_code: &str) -> Result<String, FetchError> {
        let url = build_chart_url(well_code);

        let mut last_err = FetchError::Transient("no attempt made".to_string());
        for attempt in 1..=FETCH_ATTEMPTS {
            match self.fetch_once(&url) {
                Ok(html) => return Ok(html),
                Err(FetchError::Http(status)) => {
                    // Deterministic rejection; retrying would not help.
                    return Err(FetchError::Http(status));
                }
                Err(err) => {
                    if attempt < FETCH_ATTEMPTS {
                        logging::warn(
                            DataSource::Vizugy,
                            Some(well_code),
                            &format!("attempt {}/{} failed ({}), retrying", attempt, FETCH_ATTEMPTS, err),
                        );
                    }
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}
