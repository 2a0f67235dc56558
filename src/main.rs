/// Daily batch entry point.
///
/// Exit codes: 0 when the run completes (even with per-well failures);
/// non-zero only when the well list cannot be loaded or the store cannot
/// be reached at all — in both cases no well has been processed yet.

use std::path::{Path, PathBuf};

use talajviz_service::backup::DEFAULT_BACKUP_PATH;
use talajviz_service::db::{self, PgStore};
use talajviz_service::ingest::vizugy::VizugyFetcher;
use talajviz_service::logging::{self, DataSource, LogLevel};
use talajviz_service::wells::{self, DEFAULT_WELLS_PATH};
use talajviz_service::{sync, verify};

const DEFAULT_LOG_PATH: &str = "data/scraper.log";

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let verify_only = std::env::args().any(|a| a == "--verify");

    let wells_path = env_path("TALAJVIZ_WELLS", DEFAULT_WELLS_PATH);
    let backup_path = env_path("TALAJVIZ_CSV", DEFAULT_BACKUP_PATH);
    let log_path = std::env::var("TALAJVIZ_LOG").unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string());

    // Output directories come from the resolved paths, so redirecting the
    // log or CSV via environment never leaves a stray default directory.
    for output in [Path::new(&log_path), backup_path.as_path()] {
        if let Err(e) = ensure_parent_dir(output) {
            eprintln!("cannot create directory for {}: {}", output.display(), e);
            return 1;
        }
    }

    logging::init_logger(LogLevel::Info, Some(&log_path));
    logging::info(DataSource::Sys, None, "groundwater sync starting");

    let wells = match wells::load_wells(&wells_path) {
        Ok(wells) => wells,
        Err(e) => {
            logging::error(DataSource::Sys, None, &e.to_string());
            return 1;
        }
    };
    logging::info(
        DataSource::Sys,
        None,
        &format!("{} wells loaded from {}", wells.len(), wells_path.display()),
    );

    let fetcher = match VizugyFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            logging::error(DataSource::Sys, None, &format!("HTTP client setup failed: {}", e));
            return 1;
        }
    };

    if verify_only {
        // Verification never touches the store; failures are informational.
        verify::run_verification(&fetcher, &wells);
        return 0;
    }

    let client = match db::connect_and_verify() {
        Ok(client) => client,
        Err(e) => {
            logging::error(DataSource::Db, None, &format!("store unreachable: {}", e));
            return 1;
        }
    };
    let mut store = PgStore::new(client);

    let summary = sync::run_once(&fetcher, &mut store, &wells, &backup_path);
    logging::log_run_summary(&summary);

    // Per-well failures are already in the summary; the run itself succeeded.
    0
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new(default).to_path_buf())
}

/// Creates the directory an output file lives in. A bare filename has no
/// parent component and needs nothing created.
fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_parent_dir_creates_nested_directories() {
        let base = std::env::temp_dir().join(format!("talajviz_main_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);

        let file = base.join("nested").join("out.csv");
        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn test_ensure_parent_dir_accepts_bare_filename() {
        ensure_parent_dir(Path::new("out.csv")).unwrap();
        assert!(!Path::new("out.csv").exists(), "no file or directory created");
    }
}
