// Core error taxonomy for report-monitor
use std::path::PathBuf;

use crate::extraction::ExtractionError;
use crate::redaction::RedactionError;
use crate::watcher::WatchError;
use crate::zones::ZoneError;

/// Sentinel identifier used when no capture rule finds a subject.
pub const UNKNOWN_SUBJECT: &str = "UNKNOWN_SUBJECT";

// Only directory-level and subscription-level failures are fatal, and
// only to the instance that owns the directory. Everything else is
// scoped to a single document.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("watcher error: {0}")]
    Subscription(#[from] WatchError),

    #[error("extraction failed for {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractionError,
    },

    #[error("parse failed: {0}")]
    Parse(#[from] RedactionError),

    #[error("zone profiles: {0}")]
    Zones(#[from] ZoneError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    pub fn extraction(path: impl Into<PathBuf>, source: ExtractionError) -> Self {
        Self::Extraction {
            path: path.into(),
            source,
        }
    }

    /// True for failures that only affect the current document.
    pub fn is_per_document(&self) -> bool {
        matches!(self, Self::Extraction { .. } | Self::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
