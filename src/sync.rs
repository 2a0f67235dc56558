/// Incremental synchronization engine and run orchestrator.
///
/// Each well runs its own pipeline: fetch → extract → build → sync. A well
/// that fails at any stage lands in its absorbing failed state with a typed
/// reason, and the run moves on to the next well — only a dead store
/// connection (caught before the loop starts, in `db::connect_and_verify`)
/// is fatal to a run.
///
/// Dedup is not pre-checked locally: every surviving measurement is offered
/// to the store and duplicate-key conflicts are counted as skipped. Fetch
/// windows overlap previous runs by design, so "mostly skipped" is the
/// steady state of a healthy daily run.

use std::path::Path;

use crate::backup;
use crate::db::{InsertResult, StoreError, WellStore};
use crate::ingest::chartview;
use crate::ingest::vizugy::PageFetcher;
use crate::logging::{self, DataSource};
use crate::model::{FailureReason, Measurement, RunSummary, SyncOutcome};
use crate::wells::Well;

/// Total attempts per store operation for transient failures (initial try
/// + 1 retry), matching the fetch side's budget. Store errors here are
/// connectivity-shaped and worth one more try; only after the budget is
/// exhausted does the record or well count as failed.
const STORE_ATTEMPTS: u32 = 2;

fn with_store_retry<T>(
    well_code: &str,
    operation: &str,
    mut op: impl FnMut() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut last_err = StoreError("no attempt made".to_string());
    for attempt in 1..=STORE_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < STORE_ATTEMPTS {
                    logging::warn(
                        DataSource::Db,
                        Some(well_code),
                        &format!(
                            "{} attempt {}/{} failed ({}), retrying",
                            operation, attempt, STORE_ATTEMPTS, e
                        ),
                    );
                }
                last_err = e;
            }
        }
    }
    Err(last_err)
}

// ---------------------------------------------------------------------------
// Per-well sync
// ---------------------------------------------------------------------------

/// Writes one well's measurements into the store and reports the outcome.
///
/// Measurements are inserted in the order they were decoded (ascending
/// timestamp as published by the source). A record-level store error is
/// counted and logged without aborting the rest of the well's records.
pub fn sync_well(
    store: &mut dyn WellStore,
    well: &Well,
    measurements: &[Measurement],
) -> SyncOutcome {
    let well_id = match with_store_retry(&well.code, "well id lookup", || {
        store.resolve_well_id(&well.code)
    }) {
        Ok(Some(id)) => id,
        Ok(None) => {
            let mut outcome =
                SyncOutcome::failed(&well.code, &well.name, FailureReason::WellNotRegistered);
            outcome.scraped = measurements.len();
            return outcome;
        }
        Err(e) => {
            let mut outcome =
                SyncOutcome::failed(&well.code, &well.name, FailureReason::Store(e.to_string()));
            outcome.scraped = measurements.len();
            return outcome;
        }
    };

    let mut inserted = 0;
    let mut skipped = 0;
    let mut failed_records = 0;

    for m in measurements {
        match with_store_retry(&well.code, "insert", || {
            store.insert_measurement(well_id, m.timestamp, m.water_level_m)
        }) {
            Ok(InsertResult::Inserted) => inserted += 1,
            Ok(InsertResult::Duplicate) => skipped += 1,
            Err(e) => {
                failed_records += 1;
                logging::warn(
                    DataSource::Db,
                    Some(&well.code),
                    &format!("insert failed for {}: {}", m.timestamp, e),
                );
            }
        }
    }

    SyncOutcome {
        well_code: well.code.clone(),
        well_name: well.name.clone(),
        scraped: measurements.len(),
        inserted,
        skipped,
        failed_records,
        failure_reason: None,
    }
}

// ---------------------------------------------------------------------------
// Per-well pipeline
// ---------------------------------------------------------------------------

/// Runs the full pipeline for one well. Returns the outcome plus whatever
/// was scraped, so the backup writer gets the data even when the store
/// leg failed (e.g. an unregistered well still lands in the CSV).
pub fn process_well(
    fetcher: &dyn PageFetcher,
    store: &mut dyn WellStore,
    well: &Well,
) -> (SyncOutcome, Vec<Measurement>) {
    logging::info(
        DataSource::Vizugy,
        Some(&well.code),
        &format!("{}: fetching chart page", well.name),
    );

    let html = match fetcher.fetch_chart_page(&well.code) {
        Ok(html) => html,
        Err(e) => {
            return (
                SyncOutcome::failed(&well.code, &well.name, FailureReason::Fetch(e.to_string())),
                Vec::new(),
            );
        }
    };

    let measurements = match chartview::parse_chart_page(well, &html) {
        Ok(measurements) => measurements,
        Err(e) => {
            return (
                SyncOutcome::failed(&well.code, &well.name, FailureReason::Parse(e)),
                Vec::new(),
            );
        }
    };

    logging::info(
        DataSource::Vizugy,
        Some(&well.code),
        &format!("{}: {} morning reading(s) scraped", well.name, measurements.len()),
    );

    let outcome = sync_well(store, well, &measurements);
    (outcome, measurements)
}

// ---------------------------------------------------------------------------
// Run orchestrator
// ---------------------------------------------------------------------------

/// Processes every well once, appends the CSV backup, and returns the
/// aggregated summary. Per-well failures are captured in the summary, never
/// raised — the run itself always completes.
pub fn run_once(
    fetcher: &dyn PageFetcher,
    store: &mut dyn WellStore,
    wells: &[Well],
    backup_path: &Path,
) -> RunSummary {
    let mut summary = RunSummary {
        wells_total: wells.len(),
        ..RunSummary::default()
    };
    let mut all_scraped: Vec<Measurement> = Vec::new();

    for well in wells {
        let (outcome, measurements) = process_well(fetcher, store, well);

        if let Some(reason) = &outcome.failure_reason {
            logging::log_well_failure(&well.code, &well.name, reason);
            summary.wells_failed += 1;
        } else if outcome.inserted > 0 {
            logging::info(
                DataSource::Db,
                Some(&well.code),
                &format!("{}: {} new measurement(s) inserted", well.name, outcome.inserted),
            );
        }

        summary.total_scraped += outcome.scraped;
        summary.total_inserted += outcome.inserted;
        summary.total_skipped += outcome.skipped;
        summary.outcomes.push(outcome);

        all_scraped.extend(measurements);
    }

    backup::run_backup(backup_path, wells, &all_scraped);

    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
