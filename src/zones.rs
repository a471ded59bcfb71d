// Declarative extraction zones, loaded from `profile_*.json` documents
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

pub const PROFILE_FILE_PREFIX: &str = "profile_";
pub const PROFILE_FILE_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("zone profile directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("no valid zone profile found in {0}")]
    NoValidProfiles(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single profile document was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ZoneParseError {
    #[error("malformed profile document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile_name is empty")]
    EmptyName,

    #[error("profile declares no zones")]
    NoZones,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct PageDimensions {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// A rectangle in PDF points, origin at the bottom-left of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 0-indexed pages; empty means every page.
    pub pages: Vec<u32>,
}

impl Zone {
    pub fn applies_to(&self, page: u32) -> bool {
        self.pages.is_empty() || self.pages.contains(&page)
    }

    pub fn all_pages(&self) -> bool {
        self.pages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneExtractionProfile {
    pub profile_name: String,
    pub reference_document: Option<String>,
    pub total_pages: Option<u32>,
    pub page_dimensions: PageDimensions,
    pub zones: Vec<Zone>,
    /// Lowercased; empty means the profile never matches by itself.
    pub identification_rules: Vec<String>,
    /// Document this profile was read from, if any.
    pub source: Option<PathBuf>,
}

impl ZoneExtractionProfile {
    pub fn from_json(content: &str) -> Result<Self, ZoneParseError> {
        let raw: RawProfile = serde_json::from_str(content)?;
        raw.validate()
    }

    pub fn load_file(path: &Path) -> Result<Self, ZoneParseError> {
        let content = fs::read_to_string(path)?;
        let mut profile = Self::from_json(&content)?;
        profile.source = Some(path.to_path_buf());
        Ok(profile)
    }

    fn identifies(&self, lowered: &str) -> bool {
        !self.identification_rules.is_empty()
            && self
                .identification_rules
                .iter()
                .all(|r| lowered.contains(r.as_str()))
    }
}

// `pages` may be a single page, a list, or a keyword such as "all"
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPages {
    One(i64),
    Fractional(f64),
    Many(Vec<i64>),
    Keyword(String),
}

impl RawPages {
    fn into_pages(self) -> Vec<u32> {
        let keep = |p: i64| u32::try_from(p).ok();
        match self {
            RawPages::One(p) => keep(p).into_iter().collect(),
            RawPages::Fractional(p) if p >= 0.0 => vec![p as u32],
            RawPages::Fractional(_) => Vec::new(),
            RawPages::Many(ps) => ps.into_iter().filter_map(keep).collect(),
            RawPages::Keyword(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawZone {
    #[serde(default)]
    label: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    pages: Option<RawPages>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    profile_name: String,
    #[serde(default)]
    pdf_file: Option<String>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    page_size: Option<PageDimensions>,
    #[serde(default)]
    zones: Vec<RawZone>,
    #[serde(default, alias = "identifier_patterns")]
    identification_rules: Vec<String>,
}

impl RawProfile {
    fn validate(self) -> Result<ZoneExtractionProfile, ZoneParseError> {
        let profile_name = self.profile_name.trim().to_string();
        if profile_name.is_empty() {
            return Err(ZoneParseError::EmptyName);
        }
        if self.zones.is_empty() {
            return Err(ZoneParseError::NoZones);
        }

        let zones = self
            .zones
            .into_iter()
            .map(|z| Zone {
                label: z.label,
                x: z.x,
                y: z.y,
                width: z.width,
                height: z.height,
                pages: z.pages.map(RawPages::into_pages).unwrap_or_default(),
            })
            .collect();

        Ok(ZoneExtractionProfile {
            profile_name,
            reference_document: self.pdf_file.filter(|s| !s.is_empty()),
            total_pages: self.total_pages,
            page_dimensions: self.page_size.unwrap_or_default(),
            zones,
            identification_rules: self
                .identification_rules
                .iter()
                .map(|r| r.to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
            source: None,
        })
    }
}

fn is_profile_document(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(PROFILE_FILE_PREFIX));
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PROFILE_FILE_EXTENSION));
    name_ok && ext_ok
}

/// Read-mostly list of zone profiles. A reload swaps the whole list;
/// readers keep whatever snapshot they already hold.
#[derive(Debug, Default)]
pub struct ZoneProfileStore {
    profiles: RwLock<Arc<Vec<ZoneExtractionProfile>>>,
}

impl ZoneProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: Vec<ZoneExtractionProfile>) -> Self {
        Self {
            profiles: RwLock::new(Arc::new(profiles)),
        }
    }

    /// Load every `profile_*.json` in `dir`, replacing the current list.
    /// Bad documents are skipped; the load fails only when none is valid,
    /// in which case the previous list is kept.
    pub fn load_all(&self, dir: &Path) -> Result<usize, ZoneError> {
        if !dir.is_dir() {
            return Err(ZoneError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_profile_document(path))
            .collect();
        // read_dir order is platform dependent
        candidates.sort();

        let mut loaded = Vec::with_capacity(candidates.len());
        for path in candidates {
            match ZoneExtractionProfile::load_file(&path) {
                Ok(profile) => {
                    tracing::debug!(
                        path = %path.display(),
                        profile = %profile.profile_name,
                        zones = profile.zones.len(),
                        "zone profile loaded"
                    );
                    loaded.push(profile);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping zone profile");
                }
            }
        }

        if loaded.is_empty() {
            return Err(ZoneError::NoValidProfiles(dir.to_path_buf()));
        }

        let count = loaded.len();
        match self.profiles.write() {
            Ok(mut guard) => *guard = Arc::new(loaded),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(loaded),
        }
        tracing::info!(dir = %dir.display(), count, "zone profiles loaded");
        Ok(count)
    }

    pub fn profiles(&self) -> Arc<Vec<ZoneExtractionProfile>> {
        match self.profiles.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profiles().is_empty()
    }

    /// First profile whose identification rules all appear in `text`.
    ///
    /// Without a match, the first loaded profile is returned. This is
    /// permissive: a document of an unknown layout is still routed to
    /// that profile's zones. `None` only when the store is empty.
    pub fn find_matching(&self, text: &str) -> Option<ZoneExtractionProfile> {
        let profiles = self.profiles();
        let lowered = text.to_lowercase();
        profiles
            .iter()
            .find(|p| p.identifies(&lowered))
            .or_else(|| profiles.first())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_ZONES: &str = r#"{
        "profile_name": "lettera_dimissione",
        "pdf_file": "sample.pdf",
        "total_pages": 3,
        "page_size": { "width": 595.0, "height": 842.0 },
        "zones": [
            { "label": "diagnosi", "x": 40, "y": 600, "width": 500, "height": 120, "pages": 0 },
            { "label": "terapia", "x": 40.5, "y": 100, "width": 500, "height": 300, "pages": [1, 2] },
            { "label": "firma", "x": 300, "y": 40, "width": 250, "height": 60, "pages": "all" }
        ]
    }"#;

    #[test]
    fn parses_zones_in_order() {
        let profile = ZoneExtractionProfile::from_json(THREE_ZONES).unwrap();
        assert_eq!(profile.profile_name, "lettera_dimissione");
        assert_eq!(profile.reference_document.as_deref(), Some("sample.pdf"));
        assert_eq!(profile.total_pages, Some(3));
        assert_eq!(profile.page_dimensions.height, 842.0);
        let labels: Vec<_> = profile.zones.iter().map(|z| z.label.as_str()).collect();
        assert_eq!(labels, ["diagnosi", "terapia", "firma"]);
        assert_eq!(profile.zones[0].pages, vec![0]);
        assert_eq!(profile.zones[1].pages, vec![1, 2]);
        assert!(profile.zones[2].all_pages());
        assert!(profile.identification_rules.is_empty());
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let json = r#"{ "profile_name": "min", "zones": [ { "label": "a", "x": 1, "y": 2, "width": 3, "height": 4 } ] }"#;
        let profile = ZoneExtractionProfile::from_json(json).unwrap();
        assert_eq!(profile.reference_document, None);
        assert_eq!(profile.total_pages, None);
        assert_eq!(profile.page_dimensions, PageDimensions::default());
        assert!(profile.zones[0].all_pages());
        assert!(profile.zones[0].applies_to(7));
    }

    #[test]
    fn negative_pages_are_dropped() {
        let json = r#"{ "profile_name": "neg", "zones": [ { "label": "a", "pages": -1 }, { "label": "b", "pages": [-2, 4] } ] }"#;
        let profile = ZoneExtractionProfile::from_json(json).unwrap();
        assert!(profile.zones[0].pages.is_empty());
        assert_eq!(profile.zones[1].pages, vec![4]);
    }

    #[test]
    fn rejects_missing_zones_or_name() {
        assert!(matches!(
            ZoneExtractionProfile::from_json(r#"{ "profile_name": "x" }"#),
            Err(ZoneParseError::NoZones)
        ));
        assert!(matches!(
            ZoneExtractionProfile::from_json(r#"{ "profile_name": "x", "zones": [] }"#),
            Err(ZoneParseError::NoZones)
        ));
        assert!(matches!(
            ZoneExtractionProfile::from_json(r#"{ "zones": [ { "label": "a" } ] }"#),
            Err(ZoneParseError::EmptyName)
        ));
        assert!(matches!(
            ZoneExtractionProfile::from_json("{ not json"),
            Err(ZoneParseError::Json(_))
        ));
    }

    #[test]
    fn identification_rules_accept_legacy_key() {
        let json = r#"{ "profile_name": "p", "identifier_patterns": ["ECO ADDOME"], "zones": [ { "label": "a" } ] }"#;
        let profile = ZoneExtractionProfile::from_json(json).unwrap();
        assert_eq!(profile.identification_rules, vec!["eco addome".to_string()]);
    }

    #[test]
    fn profile_document_names() {
        assert!(is_profile_document(Path::new("/tmp/profile_tsa.json")));
        assert!(is_profile_document(Path::new("profile_tsa.JSON")));
        assert!(!is_profile_document(Path::new("tsa_profile.json")));
        assert!(!is_profile_document(Path::new("profile_tsa.toml")));
    }
}
