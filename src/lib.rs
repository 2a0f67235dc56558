//! Groundwater well level scraper and sync service.
//!
//! Scrapes time-series water-level readings for a fixed set of monitoring
//! wells from vizugy.hu chart pages (the data is embedded in the HTML as
//! JavaScript array literals, not served by an API), filters each well to
//! its canonical daily morning reading, and syncs only previously-unseen
//! readings into PostgreSQL, with a CSV flat-file backup.
//!
//! Pipeline per well: fetch → extract → build → sync → backup. Wells are
//! independent; one well's failure never aborts the run.

pub mod backup;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod sync;
pub mod verify;
pub mod wells;
