/// CSV flat-file backup of scraped measurements.
///
/// A secondary record independent of the store: every run appends the
/// readings it scraped, deduplicated against rows already in the file on
/// `(timestamp, well_code)`, so repeated runs over overlapping fetch
/// windows never produce duplicate rows. The file is append-only; existing
/// rows are never rewritten.
///
/// The writer is invoked once per run after all wells complete, which keeps
/// the single-writer discipline trivial.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::logging::{self, DataSource};
use crate::model::Measurement;
use crate::wells::Well;

pub const DEFAULT_BACKUP_PATH: &str = "data/talajviz_adatok.csv";

const HEADER: &str = "timestamp,water_level_m,well_name,well_code";

/// Timestamp layout used in backup rows; matches the store's whole-second
/// canonical form so the two records stay comparable.
const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Append
// ---------------------------------------------------------------------------

/// Appends measurements not already present in the backup file.
///
/// Returns the number of rows written. Creates the file (with header) on
/// first use. None of the fields can contain a comma — well names are plain
/// Hungarian place names and the other columns are numeric/timestamp — so
/// rows are written and keyed by plain splitting, the same way the file is
/// read back.
pub fn append_measurements(
    path: &Path,
    wells: &[Well],
    measurements: &[Measurement],
) -> io::Result<usize> {
    let mut existing = read_existing_keys(path)?;

    let mut rows = Vec::new();
    for m in measurements {
        let timestamp = m.timestamp.format(ROW_TIMESTAMP_FORMAT).to_string();
        let key = (timestamp.clone(), m.well_code.clone());
        // Dedup against the file and against earlier rows of this batch.
        if !existing.insert(key) {
            continue;
        }

        let well_name = wells
            .iter()
            .find(|w| w.code == m.well_code)
            .map(|w| w.name.as_str())
            .unwrap_or("");

        rows.push(format!(
            "{},{},{},{}",
            timestamp,
            m.water_level_display(),
            well_name,
            m.well_code
        ));
    }

    if rows.is_empty() {
        return Ok(0);
    }

    // A missing file and an existing zero-byte file both need the header;
    // keying on existence alone would leave an empty file headerless and the
    // next run's reader would then eat the first data row as a header.
    let needs_header = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_header {
        writeln!(file, "{}", HEADER)?;
    }
    for row in &rows {
        writeln!(file, "{}", row)?;
    }

    Ok(rows.len())
}

/// Convenience wrapper used by the orchestrator: appends and logs the result.
pub fn run_backup(path: &Path, wells: &[Well], measurements: &[Measurement]) {
    match append_measurements(path, wells, measurements) {
        Ok(0) => logging::info(DataSource::Backup, None, "no new rows for CSV backup"),
        Ok(n) => logging::info(
            DataSource::Backup,
            None,
            &format!("{} new row(s) appended to {}", n, path.display()),
        ),
        Err(e) => logging::error(
            DataSource::Backup,
            None,
            &format!("CSV backup failed for {}: {}", path.display(), e),
        ),
    }
}

/// Collects `(timestamp, well_code)` keys of rows already in the file.
fn read_existing_keys(path: &Path) -> io::Result<HashSet<(String, String)>> {
    let mut keys = HashSet::new();
    if !path.exists() {
        return Ok(keys);
    }

    let text = fs::read_to_string(path)?;
    for (i, line) in text.lines().enumerate() {
        if i == 0 || line.trim().is_empty() {
            continue; // header
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            continue; // tolerate hand-edited or truncated rows
        }
        keys.insert((fields[0].to_string(), fields[3].to_string()));
    }

    Ok(keys)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
