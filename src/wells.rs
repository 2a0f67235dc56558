/// Monitored well configuration.
///
/// The canonical list of groundwater wells lives in `wells.toml` and is
/// loaded once at process start. All other modules should take `Well`
/// values from here rather than hardcoding well codes. An empty or
/// malformed list is a configuration error and aborts the run before any
/// well is processed.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Default path of the well list, relative to the working directory.
pub const DEFAULT_WELLS_PATH: &str = "wells.toml";

/// Hours of day treated as the canonical daily reading when a well does not
/// configure its own set. Observed sampling: some wells report at 07:00,
/// others at 08:00.
pub const DEFAULT_MORNING_HOURS: [u32; 2] = [7, 8];

// ---------------------------------------------------------------------------
// Well
// ---------------------------------------------------------------------------

/// One monitored well. `code` is the vizugy.hu törzsszám: it keys the chart
/// page URL, the store lookup, and the CSV backup rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Well {
    pub code: String,
    pub name: String,
    /// Hour-of-day allow-list for the morning-reading filter.
    #[serde(default = "default_morning_hours")]
    pub morning_hours: Vec<u32>,
}

fn default_morning_hours() -> Vec<u32> {
    DEFAULT_MORNING_HOURS.to_vec()
}

#[derive(Debug, Deserialize)]
struct WellsFile {
    wells: Vec<Well>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum WellConfigError {
    Io(String),
    Malformed(String),
    Empty,
    Invalid(String),
}

impl fmt::Display for WellConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WellConfigError::Io(msg) => write!(f, "cannot read well list: {}", msg),
            WellConfigError::Malformed(msg) => write!(f, "well list is not valid TOML: {}", msg),
            WellConfigError::Empty => write!(f, "well list contains no wells"),
            WellConfigError::Invalid(msg) => write!(f, "well list entry invalid: {}", msg),
        }
    }
}

impl std::error::Error for WellConfigError {}

/// Loads and validates the well list. Called once per run.
pub fn load_wells(path: &Path) -> Result<Vec<Well>, WellConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|e| WellConfigError::Io(format!("{}: {}", path.display(), e)))?;

    let file: WellsFile =
        toml::from_str(&text).map_err(|e| WellConfigError::Malformed(e.to_string()))?;

    validate(&file.wells)?;
    Ok(file.wells)
}

fn validate(wells: &[Well]) -> Result<(), WellConfigError> {
    if wells.is_empty() {
        return Err(WellConfigError::Empty);
    }

    let mut seen = std::collections::HashSet::new();
    for well in wells {
        if well.code.is_empty() || !well.code.chars().all(|c| c.is_ascii_digit()) {
            return Err(WellConfigError::Invalid(format!(
                "well '{}' has non-numeric code '{}'",
                well.name, well.code
            )));
        }
        if !seen.insert(well.code.as_str()) {
            return Err(WellConfigError::Invalid(format!(
                "duplicate well code '{}'",
                well.code
            )));
        }
        if well.morning_hours.is_empty() {
            return Err(WellConfigError::Invalid(format!(
                "well '{}' has an empty morning_hours set",
                well.name
            )));
        }
        if let Some(bad) = well.morning_hours.iter().find(|h| **h > 23) {
            return Err(WellConfigError::Invalid(format!(
                "well '{}' has out-of-range morning hour {}",
                well.name, bad
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
