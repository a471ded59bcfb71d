// report-monitor: watch a folder for scanned medical reports and turn
// each new PDF into a clean, de-identified text file.
pub mod config;
pub mod enrichment;
pub mod extraction;
pub mod logging;
pub mod pipeline;
pub mod profiles;
pub mod redaction;
pub mod setup;
pub mod sinks;
pub mod types;
pub mod watcher;
pub mod zones;

pub use config::AppConfig;
pub use pipeline::{Pipeline, ProcessedDocument};
pub use profiles::{DocumentProfile, ProfileCatalog};
pub use redaction::{ParsedReport, RedactionEngine};
pub use types::{MonitorError, Result, UNKNOWN_SUBJECT};
pub use watcher::{ChangeWatcher, WatchHandle, WatchPolicy};
pub use zones::{ZoneExtractionProfile, ZoneProfileStore};
