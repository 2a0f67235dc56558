/// Core data types for the groundwater sync service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O — only types, their constructors, and error variants.

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// A single retained water-level reading for one well.
///
/// Built by `ingest::chartview::build_measurements` from one aligned
/// (value, timestamp) pair of the embedded chart arrays. The source stores
/// water levels in centimeters; `water_level_m` is the converted value in
/// meters at two-decimal precision. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub well_code: String,
    /// Naive civil time as published by the source (no offset information).
    pub timestamp: NaiveDateTime,
    pub water_level_m: f64,
}

impl Measurement {
    /// Canonical two-decimal string form, used for the CSV backup.
    pub fn water_level_display(&self) -> String {
        format!("{:.2}", self.water_level_m)
    }
}

// ---------------------------------------------------------------------------
// Sync outcome
// ---------------------------------------------------------------------------

/// Per-well result of one run. Built fresh each run and summarized in the
/// run report; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub well_code: String,
    pub well_name: String,
    /// Measurements surviving the morning filter for this well.
    pub scraped: usize,
    /// Records newly written to the store.
    pub inserted: usize,
    /// Records the store already had (duplicate-key conflicts).
    pub skipped: usize,
    /// Records that failed with a non-conflict store error.
    pub failed_records: usize,
    pub failure_reason: Option<FailureReason>,
}

impl SyncOutcome {
    pub fn failed(well_code: &str, well_name: &str, reason: FailureReason) -> Self {
        SyncOutcome {
            well_code: well_code.to_string(),
            well_name: well_name.to_string(),
            scraped: 0,
            inserted: 0,
            skipped: 0,
            failed_records: 0,
            failure_reason: Some(reason),
        }
    }
}

/// Aggregated counts across all wells in one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub wells_total: usize,
    pub wells_failed: usize,
    pub total_scraped: usize,
    pub total_inserted: usize,
    pub total_skipped: usize,
    pub outcomes: Vec<SyncOutcome>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural failures of the embedded-array extraction chain.
///
/// These are deterministic for a given page: retrying the fetch will not
/// make them succeed, so the sync engine never retries them. Each variant
/// names the exact stage that rejected the page, so the run summary can
/// distinguish "page layout changed" from "no data" from transient trouble.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartParseError {
    /// The `marker(` token never appears in the document.
    MarkerNotFound,
    /// The marker's call expression never closes before end-of-document.
    UnterminatedCall,
    /// The `],[` boundary between the two arrays is absent.
    MissingBoundary,
    /// The second array has no closing `]` in the remaining arguments.
    UnboundedSecondArray,
    /// One of the array payloads is not a valid JSON array literal.
    DecodeError(String),
    /// The two arrays decoded to different lengths; pairing them would
    /// misalign every element, so the whole pair is rejected.
    LengthMismatch { values: usize, timestamps: usize },
}

impl std::fmt::Display for ChartParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartParseError::MarkerNotFound => write!(f, "chart marker not found in page"),
            ChartParseError::UnterminatedCall => write!(f, "chart call never closes"),
            ChartParseError::MissingBoundary => write!(f, "array boundary `],[` not found"),
            ChartParseError::UnboundedSecondArray => write!(f, "second array has no closing `]`"),
            ChartParseError::DecodeError(msg) => write!(f, "array decode failed: {}", msg),
            ChartParseError::LengthMismatch { values, timestamps } => write!(
                f,
                "array length mismatch: {} values vs {} timestamps",
                values, timestamps
            ),
        }
    }
}

impl std::error::Error for ChartParseError {}

/// Why a well's pipeline entered its absorbing failed state. One variant per
/// pipeline stage that can fail; wells that never fail carry `None` in their
/// `SyncOutcome` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Fetch failed after exhausting the retry budget, or returned a
    /// non-success HTTP status.
    Fetch(String),
    /// The page was fetched but the embedded arrays could not be extracted.
    Parse(ChartParseError),
    /// The well code has no row in the store; nothing can be inserted.
    WellNotRegistered,
    /// The store rejected the well's id lookup with a non-NotFound error.
    Store(String),
}

impl FailureReason {
    /// Transient failures may succeed on a later run; structural ones will
    /// not until the source page or configuration changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureReason::Fetch(_) | FailureReason::Store(_))
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            FailureReason::Parse(e) => write!(f, "parse failed: {}", e),
            FailureReason::WellNotRegistered => write!(f, "well not registered in store"),
            FailureReason::Store(msg) => write!(f, "store error: {}", msg),
        }
    }
}
