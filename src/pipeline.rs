// Per-document coordinator: extract, classify, redact, enrich, deliver
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::enrichment::Enricher;
use crate::extraction::TextExtractor;
use crate::profiles::ProfileCatalog;
use crate::redaction::{extract_identifier, ParsedReport, RedactionEngine};
use crate::sinks::{Delivered, OutputSink};
use crate::types::{MonitorError, Result, UNKNOWN_SUBJECT};
use crate::zones::ZoneProfileStore;

/// Outcome of one successfully processed document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub source: PathBuf,
    pub report: ParsedReport,
    /// Zone profile used for precision extraction, if any.
    pub zone_profile: Option<String>,
    /// Text handed to the sinks: the enriched text or the cleaned body.
    pub text: String,
    pub enriched: bool,
    pub outputs: Vec<Delivered>,
    pub processed_at: DateTime<Local>,
}

struct ZoneStage {
    store: Arc<ZoneProfileStore>,
    extractor: Box<dyn TextExtractor>,
}

pub struct Pipeline {
    catalog: Arc<ProfileCatalog>,
    engine: RedactionEngine,
    extractor: Box<dyn TextExtractor>,
    zones: Option<ZoneStage>,
    enricher: Option<Box<dyn Enricher>>,
    sinks: Vec<Box<dyn OutputSink>>,
}

impl Pipeline {
    pub fn new(catalog: Arc<ProfileCatalog>, extractor: Box<dyn TextExtractor>) -> Self {
        Self {
            catalog,
            engine: RedactionEngine::new(),
            extractor,
            zones: None,
            enricher: None,
            sinks: Vec::new(),
        }
    }

    pub fn with_zones(mut self, store: Arc<ZoneProfileStore>, extractor: Box<dyn TextExtractor>) -> Self {
        self.zones = Some(ZoneStage { store, extractor });
        self
    }

    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Run one document through every stage.
    ///
    /// Extraction and parse failures are returned; enrichment and sink
    /// failures are logged and the document still counts as processed.
    pub fn handle(&self, path: &Path) -> Result<ProcessedDocument> {
        let full_text = self
            .extractor
            .extract(path)
            .map_err(|e| MonitorError::extraction(path, e))?;

        let profile = self.catalog.match_profile(&full_text);
        debug!(path = %path.display(), profile = profile.name(), "profile selected");

        let (report, zone_profile) = match self.precision_text(path, &full_text) {
            Some((zone_text, zone_name)) => {
                let mut report = self.engine.process(&zone_text, profile)?;
                // zones may crop away the patient header
                if report.identifier == UNKNOWN_SUBJECT {
                    report.identifier = extract_identifier(&full_text, profile);
                }
                (report, Some(zone_name))
            }
            None => (self.engine.process(&full_text, profile)?, None),
        };

        let (text, enriched) = self.enrich(&report.body);
        let outputs = self.deliver(&report.identifier, &text);

        info!(
            path = %path.display(),
            profile = %report.profile_name,
            identifier = %report.identifier,
            enriched,
            outputs = outputs.len(),
            "report processed"
        );

        Ok(ProcessedDocument {
            source: path.to_path_buf(),
            report,
            zone_profile,
            text,
            enriched,
            outputs,
            processed_at: Local::now(),
        })
    }

    /// Watcher callback. Never panics and never stops the watch.
    pub fn on_arrival(&self, path: &Path) {
        if let Err(e) = self.handle(path) {
            if e.is_per_document() {
                warn!(path = %path.display(), error = %e, "document skipped");
            } else {
                error!(path = %path.display(), error = %e, "document failed");
            }
        }
    }

    fn precision_text(&self, path: &Path, full_text: &str) -> Option<(String, String)> {
        let stage = self.zones.as_ref()?;
        let profile = stage.store.find_matching(full_text)?;

        match stage.extractor.extract_zones(path, &profile) {
            Ok(text) if !text.trim().is_empty() => {
                debug!(profile = %profile.profile_name, "using zone text");
                Some((text, profile.profile_name))
            }
            Ok(_) => {
                warn!(profile = %profile.profile_name, "zone extraction empty, using full text");
                None
            }
            Err(e) => {
                warn!(profile = %profile.profile_name, error = %e, "zone extraction failed, using full text");
                None
            }
        }
    }

    fn enrich(&self, body: &str) -> (String, bool) {
        let Some(enricher) = &self.enricher else {
            return (body.to_string(), false);
        };
        match enricher.analyze(body) {
            Ok(text) => (text, true),
            Err(e) => {
                warn!(error = %e, "analysis failed, keeping cleaned text");
                (body.to_string(), false)
            }
        }
    }

    fn deliver(&self, identifier: &str, text: &str) -> Vec<Delivered> {
        self.sinks
            .iter()
            .filter_map(|sink| match sink.deliver(identifier, text) {
                Ok(delivered) => Some(delivered),
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "output failed");
                    None
                }
            })
            .collect()
    }
}
