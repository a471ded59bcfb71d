// High-precision zone extraction through an external python script
//
// Invocation: <python> <script> <pdf> <profile.json>, text on stdout.
// Full-document extraction is delegated to pdftotext.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use super::{ensure_file, non_empty, run_with_timeout, ExtractionError, PdfToText, TextExtractor};
use crate::zones::ZoneExtractionProfile;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ZoneScript {
    python: PathBuf,
    script: PathBuf,
    timeout: Duration,
    full_text: PdfToText,
}

impl ZoneScript {
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>, full_text: PdfToText) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
            timeout: DEFAULT_TIMEOUT,
            full_text,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// True when the script exists and the interpreter answers `--version`.
    pub fn is_available(&self) -> bool {
        self.script.is_file()
            && Command::new(&self.python)
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    fn tool(&self) -> String {
        self.python.display().to_string()
    }
}

impl TextExtractor for ZoneScript {
    fn name(&self) -> &str {
        "zone-script"
    }

    fn extract(&self, pdf: &Path) -> Result<String, ExtractionError> {
        self.full_text.extract(pdf)
    }

    fn extract_zones(
        &self,
        pdf: &Path,
        profile: &ZoneExtractionProfile,
    ) -> Result<String, ExtractionError> {
        ensure_file(pdf)?;
        let tool = self.tool();

        // the script reads the profile document itself
        let Some(profile_path) = profile.source.as_deref() else {
            return Err(ExtractionError::UnsupportedProfile {
                tool,
                profile: profile.profile_name.clone(),
            });
        };
        if !self.script.is_file() {
            return Err(ExtractionError::MissingFile(self.script.clone()));
        }

        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script).arg(pdf).arg(profile_path);
        let text = run_with_timeout(cmd, &tool, None, self.timeout)?.into_stdout(&tool)?;

        debug!(
            path = %pdf.display(),
            profile = %profile.profile_name,
            chars = text.len(),
            "zone script finished"
        );
        non_empty(&tool, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::{PageDimensions, Zone};

    fn profile(source: Option<PathBuf>) -> ZoneExtractionProfile {
        ZoneExtractionProfile {
            profile_name: "rx".into(),
            reference_document: None,
            total_pages: None,
            page_dimensions: PageDimensions::default(),
            zones: vec![Zone {
                label: "body".into(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                pages: vec![],
            }],
            identification_rules: vec![],
            source,
        }
    }

    #[test]
    fn profile_without_source_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let script = ZoneScript::new("python3", dir.path().join("extract_zones.py"), PdfToText::default());
        let err = script.extract_zones(&pdf, &profile(None)).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedProfile { .. }));
    }

    #[test]
    fn missing_script_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let script = ZoneScript::new("python3", dir.path().join("nope.py"), PdfToText::default());
        let err = script
            .extract_zones(&pdf, &profile(Some(dir.path().join("profile_rx.json"))))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingFile(p) if p.ends_with("nope.py")));
        assert!(!script.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn runs_script_with_pdf_and_profile_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let script_path = dir.path().join("echo_args.sh");
        std::fs::write(&script_path, "printf '%s|%s' \"$(basename \"$1\")\" \"$(basename \"$2\")\"\n").unwrap();

        let script = ZoneScript::new("sh", &script_path, PdfToText::default());
        let text = script
            .extract_zones(&pdf, &profile(Some(dir.path().join("profile_rx.json"))))
            .unwrap();
        assert_eq!(text, "a.pdf|profile_rx.json");
    }
}
