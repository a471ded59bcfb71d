// Persistent configuration for report-monitor
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::MonitorError;
use crate::watcher::WatchPolicy;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "REPORT_MONITOR_CONFIG";
const APP_DIR: &str = "report-monitor";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch_dir: PathBuf,
    /// Defaults to `watch_dir`.
    pub output_dir: Option<PathBuf>,
    pub pdftotext_path: PathBuf,
    pub clipboard: bool,
    /// Extra document profiles, tried before the built-in ones.
    pub profiles_file: Option<PathBuf>,
    pub watch: WatchConfig,
    pub zones: ZonesConfig,
    pub enrichment: EnrichmentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::new(),
            output_dir: None,
            pdftotext_path: PathBuf::from("pdftotext"),
            clipboard: true,
            profiles_file: None,
            watch: WatchConfig::default(),
            zones: ZonesConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub grace_ms: u64,
    pub suppression_secs: u64,
    pub retention_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let policy = WatchPolicy::default();
        Self {
            grace_ms: policy.grace.as_millis() as u64,
            suppression_secs: policy.suppression.as_secs(),
            retention_secs: policy.retention.as_secs(),
        }
    }
}

impl WatchConfig {
    pub fn policy(&self) -> WatchPolicy {
        WatchPolicy {
            grace: Duration::from_millis(self.grace_ms),
            suppression: Duration::from_secs(self.suppression_secs),
            retention: Duration::from_secs(self.retention_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneMode {
    #[default]
    Off,
    Pdftotext,
    Script,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ZonesConfig {
    pub mode: ZoneMode,
    pub profiles_dir: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub python: PathBuf,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            mode: ZoneMode::Off,
            profiles_dir: None,
            script_path: None,
            python: PathBuf::from("python3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    pub min_output_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "claude".to_string(),
            args: vec!["--print".to_string()],
            timeout_ms: 120_000,
            min_output_chars: 50,
        }
    }
}

impl AppConfig {
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            ..Self::default()
        }
    }

    /// `--config` flag, then `REPORT_MONITOR_CONFIG`, then the user config dir.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let base = dirs::config_dir().context("no user configuration directory on this system")?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("cannot write config {}", path.display()))?;
        Ok(())
    }

    /// Where reports are written.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.watch_dir)
    }

    pub fn validate(&self) -> std::result::Result<(), MonitorError> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(MonitorError::Configuration("watch_dir is not set".into()));
        }
        if !self.watch_dir.is_dir() {
            return Err(MonitorError::Configuration(format!(
                "watch directory does not exist: {}",
                self.watch_dir.display()
            )));
        }
        if let Some(out) = &self.output_dir {
            if !out.is_dir() {
                return Err(MonitorError::Configuration(format!(
                    "output directory does not exist: {}",
                    out.display()
                )));
            }
        }
        if self.zones.mode == ZoneMode::Script && self.zones.script_path.is_none() {
            return Err(MonitorError::Configuration(
                "zones.mode = \"script\" needs zones.script_path".into(),
            ));
        }
        if self.zones.mode != ZoneMode::Off && self.zones.profiles_dir.is_none() {
            return Err(MonitorError::Configuration(
                "zone extraction needs zones.profiles_dir".into(),
            ));
        }
        Ok(())
    }
}
