// Document profiles and the catalog that picks one for a given text
pub mod builtin;
pub mod rules;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use rules::{CaptureRules, IdentificationRules, RuleError, RuleSet};

/// A named bundle of rules for one report template. Immutable once built.
#[derive(Debug, Clone)]
pub struct DocumentProfile {
    name: String,
    identification: IdentificationRules,
    identifier_capture: CaptureRules,
    exclusion: RuleSet,
    retention: RuleSet,
    section_breaks: RuleSet,
}

impl DocumentProfile {
    pub fn builder(name: impl Into<String>) -> ProfileBuilder {
        ProfileBuilder {
            name: name.into(),
            ..ProfileBuilder::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identification(&self) -> &IdentificationRules {
        &self.identification
    }

    pub fn identifier_capture(&self) -> &CaptureRules {
        &self.identifier_capture
    }

    pub fn exclusion(&self) -> &RuleSet {
        &self.exclusion
    }

    pub fn retention(&self) -> &RuleSet {
        &self.retention
    }

    pub fn section_breaks(&self) -> &RuleSet {
        &self.section_breaks
    }

    /// Every rule that was dropped while compiling this profile.
    pub fn rejected_rules(&self) -> impl Iterator<Item = &RuleError> {
        self.identifier_capture
            .rejected()
            .iter()
            .chain(self.exclusion.rejected())
            .chain(self.retention.rejected())
            .chain(self.section_breaks.rejected())
    }
}

#[derive(Debug, Default)]
pub struct ProfileBuilder {
    name: String,
    identification: Vec<String>,
    capture: Vec<String>,
    exclude: Vec<String>,
    retain: Vec<String>,
    section_breaks: Vec<String>,
}

fn push_all<I, S>(dst: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    dst.extend(items.into_iter().map(Into::into));
}

impl ProfileBuilder {
    pub fn identify<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_all(&mut self.identification, needles);
        self
    }

    pub fn capture<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_all(&mut self.capture, patterns);
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_all(&mut self.exclude, patterns);
        self
    }

    pub fn retain<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_all(&mut self.retain, patterns);
        self
    }

    pub fn section_break<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_all(&mut self.section_breaks, patterns);
        self
    }

    pub fn build(self) -> DocumentProfile {
        let profile = DocumentProfile {
            identification: IdentificationRules::new(&self.identification),
            identifier_capture: CaptureRules::compile(&self.capture),
            exclusion: RuleSet::compile(&self.exclude),
            retention: RuleSet::compile(&self.retain),
            section_breaks: RuleSet::compile(&self.section_breaks),
            name: self.name,
        };
        let rejected = profile.rejected_rules().count();
        if rejected > 0 {
            tracing::warn!(profile = %profile.name, rejected, "profile has rules that do not compile");
        }
        profile
    }
}

/// On-disk shape of a custom profile (`[[profile]]` table).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileTable {
    pub name: String,
    #[serde(default)]
    pub identification: Vec<String>,
    #[serde(default)]
    pub identifier_capture: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub retain: Vec<String>,
    #[serde(default)]
    pub section_breaks: Vec<String>,
}

impl From<ProfileTable> for DocumentProfile {
    fn from(table: ProfileTable) -> Self {
        DocumentProfile::builder(table.name)
            .identify(table.identification)
            .capture(table.identifier_capture)
            .exclude(table.exclude)
            .retain(table.retain)
            .section_break(table.section_breaks)
            .build()
    }
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default, rename = "profile")]
    profiles: Vec<ProfileTable>,
}

/// Ordered, first-match-wins collection of profiles plus a default.
///
/// Built once and shared read-only (usually behind an `Arc`), so
/// concurrent callers need no locking.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<DocumentProfile>,
    default_profile: DocumentProfile,
}

impl ProfileCatalog {
    pub fn new(profiles: Vec<DocumentProfile>, default_profile: DocumentProfile) -> Self {
        Self {
            profiles,
            default_profile,
        }
    }

    /// The templates this program ships with.
    pub fn builtin() -> Self {
        Self::new(builtin::registered(), builtin::default_profile())
    }

    /// Built-in catalog with `custom` profiles registered ahead of the
    /// shipped ones, so a local template wins over a shipped one.
    pub fn builtin_with(custom: Vec<DocumentProfile>) -> Self {
        let mut profiles = custom;
        profiles.extend(builtin::registered());
        Self::new(profiles, builtin::default_profile())
    }

    pub fn from_toml_str(content: &str) -> Result<Vec<DocumentProfile>> {
        let file: ProfileFile = toml::from_str(content).context("invalid profile file")?;
        Ok(file.profiles.into_iter().map(DocumentProfile::from).collect())
    }

    pub fn load_file(path: &Path) -> Result<Vec<DocumentProfile>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse profile file {}", path.display()))
    }

    /// First profile whose identification rules are all present, else the default.
    pub fn match_profile(&self, text: &str) -> &DocumentProfile {
        let lowered = text.to_lowercase();
        self.profiles
            .iter()
            .find(|p| p.identification.all_found_in(&lowered))
            .unwrap_or(&self.default_profile)
    }

    pub fn profiles(&self) -> &[DocumentProfile] {
        &self.profiles
    }

    pub fn default_profile(&self) -> &DocumentProfile {
        &self.default_profile
    }

    pub fn get(&self, name: &str) -> Option<&DocumentProfile> {
        if self.default_profile.name == name {
            return Some(&self.default_profile);
        }
        self.profiles.iter().find(|p| p.name == name)
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
