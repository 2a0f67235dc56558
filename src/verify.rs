/// Well endpoint verification.
///
/// Fetches and parses every configured well against the live endpoint
/// without touching the store. Run it after editing wells.toml, or when a
/// scheduled run starts reporting parse failures, to see which wells the
/// source still serves and how many readings each one yields.

use crate::ingest::chartview;
use crate::ingest::vizugy::PageFetcher;
use crate::wells::Well;

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStatus {
    /// Page fetched, arrays parsed, at least one morning reading present.
    Success,
    /// Page parsed but the morning filter left nothing.
    NoReadings,
    Failed,
}

#[derive(Debug, Clone)]
pub struct WellVerification {
    pub well_code: String,
    pub well_name: String,
    pub status: VerificationStatus,
    pub measurement_count: usize,
    pub error_message: Option<String>,
}

pub fn verify_well(fetcher: &dyn PageFetcher, well: &Well) -> WellVerification {
    let mut result = WellVerification {
        well_code: well.code.clone(),
        well_name: well.name.clone(),
        status: VerificationStatus::Failed,
        measurement_count: 0,
        error_message: None,
    };

    let html = match fetcher.fetch_chart_page(&well.code) {
        Ok(html) => html,
        Err(e) => {
            result.error_message = Some(format!("fetch failed: {}", e));
            return result;
        }
    };

    match chartview::parse_chart_page(well, &html) {
        Ok(measurements) => {
            result.measurement_count = measurements.len();
            result.status = if measurements.is_empty() {
                VerificationStatus::NoReadings
            } else {
                VerificationStatus::Success
            };
        }
        Err(e) => {
            result.error_message = Some(format!("parse failed: {}", e));
        }
    }

    result
}

/// Verifies every well and prints a per-well line plus a summary.
/// Returns the number of failed wells.
pub fn run_verification(fetcher: &dyn PageFetcher, wells: &[Well]) -> usize {
    let mut failed = 0;

    println!("Verifying {} wells against vizugy.hu...", wells.len());
    for well in wells {
        print!("  {} ({}) ... ", well.name, well.code);
        let result = verify_well(fetcher, well);
        match result.status {
            VerificationStatus::Success => {
                println!("OK ({} morning readings)", result.measurement_count);
            }
            VerificationStatus::NoReadings => {
                println!("parsed, but no readings in hours {:?}", well.morning_hours);
            }
            VerificationStatus::Failed => {
                println!("FAILED: {}", result.error_message.as_deref().unwrap_or("unknown"));
                failed += 1;
            }
        }
    }

    println!(
        "\n{}/{} wells verified, {} failed",
        wells.len() - failed,
        wells.len(),
        failed
    );
    failed
}
