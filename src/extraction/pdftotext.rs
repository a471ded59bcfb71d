// Text extraction using the poppler pdftotext utility
//
// Full documents are converted with:
//   pdftotext -enc UTF-8 -layout <pdf> -
// Zones are cropped one page at a time with -x -y -W -H, which take
// top-left-origin coordinates at the default 72 dpi (one unit per point).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ensure_file, non_empty, run_with_timeout, ExtractionError, TextExtractor};
use crate::zones::{PageDimensions, Zone, ZoneExtractionProfile};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TOOL: &str = "pdftotext";

#[derive(Debug, Clone)]
pub struct PdfToText {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new(TOOL)
    }
}

/// Crop box for one zone in pdftotext's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CropBox {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl CropBox {
    fn for_zone(zone: &Zone, page: &PageDimensions) -> Self {
        // Zones are measured from the bottom-left corner.
        let top = if page.height > 0.0 {
            page.height - (zone.y + zone.height)
        } else {
            zone.y
        };
        Self {
            x: zone.x.round() as i64,
            y: top.max(0.0).round() as i64,
            width: zone.width.round().max(1.0) as i64,
            height: zone.height.round().max(1.0) as i64,
        }
    }
}

impl PdfToText {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the binary can be launched at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary).arg("-v").output().is_ok()
    }

    fn run(&self, args: &[String], pdf: &Path) -> Result<String, ExtractionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-enc", "UTF-8", "-layout"])
            .args(args)
            .arg(pdf)
            .arg("-");
        run_with_timeout(cmd, TOOL, None, self.timeout)?.into_stdout(TOOL)
    }

    fn extract_zone(
        &self,
        pdf: &Path,
        zone: &Zone,
        profile: &ZoneExtractionProfile,
    ) -> Result<String, ExtractionError> {
        let crop = CropBox::for_zone(zone, &profile.page_dimensions);
        let base = vec![
            "-x".to_string(),
            crop.x.to_string(),
            "-y".to_string(),
            crop.y.to_string(),
            "-W".to_string(),
            crop.width.to_string(),
            "-H".to_string(),
            crop.height.to_string(),
        ];

        let pages = zone_pages(zone, profile.total_pages);
        if pages.is_empty() {
            return self.run(&base, pdf).map(|t| t.trim().to_string());
        }

        let mut parts = Vec::new();
        for page in pages {
            // pdftotext pages are 1-based
            let number = (page + 1).to_string();
            let mut args = base.clone();
            args.extend(["-f".to_string(), number.clone(), "-l".to_string(), number]);
            let text = self.run(&args, pdf)?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        Ok(parts.join("\n"))
    }
}

/// 0-indexed pages to crop, or empty for a single all-pages invocation.
fn zone_pages(zone: &Zone, total_pages: Option<u32>) -> Vec<u32> {
    if !zone.all_pages() {
        return zone
            .pages
            .iter()
            .copied()
            .filter(|p| total_pages.map_or(true, |total| *p < total))
            .collect();
    }
    match total_pages {
        Some(total) => (0..total).collect(),
        None => Vec::new(),
    }
}

impl TextExtractor for PdfToText {
    fn name(&self) -> &str {
        TOOL
    }

    fn extract(&self, pdf: &Path) -> Result<String, ExtractionError> {
        ensure_file(pdf)?;
        let text = self.run(&[], pdf)?;
        debug!(path = %pdf.display(), chars = text.len(), "full text extracted");
        non_empty(TOOL, text)
    }

    fn extract_zones(
        &self,
        pdf: &Path,
        profile: &ZoneExtractionProfile,
    ) -> Result<String, ExtractionError> {
        ensure_file(pdf)?;

        let mut parts = Vec::with_capacity(profile.zones.len());
        for zone in &profile.zones {
            match self.extract_zone(pdf, zone, profile) {
                Ok(text) if !text.is_empty() => parts.push(text),
                Ok(_) => debug!(zone = %zone.label, "zone is empty"),
                Err(e) => warn!(zone = %zone.label, error = %e, "zone extraction failed"),
            }
        }

        debug!(
            path = %pdf.display(),
            profile = %profile.profile_name,
            zones = parts.len(),
            "zone text extracted"
        );
        non_empty(TOOL, parts.join("\n"))
    }
}
