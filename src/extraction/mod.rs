// PDF text extraction through external tools
//
// Both extractors shell out: pdftotext for the full page text and for
// cropped zones, and an optional python script for high-precision zones.
// Output is always UTF-8 text; an empty result counts as a failure.

mod command;
mod pdftotext;
mod script;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::zones::ZoneExtractionProfile;

pub use command::{run_with_timeout, CommandOutput};
pub use pdftotext::PdfToText;
pub use script::ZoneScript;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("{tool} produced no text")]
    EmptyOutput { tool: String },

    #[error("zone profile '{profile}' cannot be used by {tool}")]
    UnsupportedProfile { tool: String, profile: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of raw text for the pipeline.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Full text of every page.
    fn extract(&self, pdf: &Path) -> Result<String, ExtractionError>;

    /// Text inside the profile's zones, in zone order.
    fn extract_zones(
        &self,
        pdf: &Path,
        profile: &ZoneExtractionProfile,
    ) -> Result<String, ExtractionError>;
}

fn ensure_file(pdf: &Path) -> Result<(), ExtractionError> {
    if pdf.is_file() {
        Ok(())
    } else {
        Err(ExtractionError::MissingFile(pdf.to_path_buf()))
    }
}

fn non_empty(tool: &str, text: String) -> Result<String, ExtractionError> {
    if text.trim().is_empty() {
        Err(ExtractionError::EmptyOutput {
            tool: tool.to_string(),
        })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_output_is_empty() {
        assert!(matches!(
            non_empty("pdftotext", " \n\x0c\n".to_string()),
            Err(ExtractionError::EmptyOutput { .. })
        ));
        assert_eq!(non_empty("pdftotext", "ok".to_string()).unwrap(), "ok");
    }

    #[test]
    fn tool_failure_message_names_the_exit() {
        let err = ExtractionError::ToolFailed {
            tool: "pdftotext".into(),
            code: Some(1),
            stderr: "Syntax Error".into(),
        };
        assert_eq!(err.to_string(), "pdftotext exited with status 1: Syntax Error");

        let killed = ExtractionError::ToolFailed {
            tool: "python3".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("signal"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ensure_file(Path::new("/no/such/report.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingFile(_)));
    }
}
