// Line-level redaction and reflow of extracted report text
use crate::profiles::{DocumentProfile, ProfileCatalog};
use crate::types::UNKNOWN_SUBJECT;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedactionError {
    #[error("input text is empty")]
    EmptyInput,
}

/// Result of one redaction pass. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    /// Filename-safe subject token, e.g. `MARIO_ROSSI`.
    pub identifier: String,
    pub body: String,
    pub profile_name: String,
}

/// Stateless; one instance can serve any number of documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactionEngine;

impl RedactionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn process(
        &self,
        raw: &str,
        profile: &DocumentProfile,
    ) -> Result<ParsedReport, RedactionError> {
        if raw.is_empty() {
            return Err(RedactionError::EmptyInput);
        }

        let identifier = extract_identifier(raw, profile);

        let kept = filter_lines(raw, profile);
        let mut body = kept.join(" ");

        for rule in profile.section_breaks().iter() {
            body = rule.replace_all(&body, "\n$0").into_owned();
        }

        let body = normalize_whitespace(&body);

        tracing::debug!(
            profile = profile.name(),
            identifier = %identifier,
            kept_lines = kept.len(),
            "report redacted"
        );

        Ok(ParsedReport {
            identifier,
            body,
            profile_name: profile.name().to_string(),
        })
    }

    /// Select a profile from the catalog, then process with it.
    pub fn match_and_process(
        &self,
        catalog: &ProfileCatalog,
        raw: &str,
    ) -> Result<ParsedReport, RedactionError> {
        self.process(raw, catalog.match_profile(raw))
    }
}

/// Normalized subject identifier, or [`UNKNOWN_SUBJECT`] when no capture
/// rule yields letters.
pub fn extract_identifier(raw: &str, profile: &DocumentProfile) -> String {
    profile
        .identifier_capture()
        .capture(raw)
        .map(normalize_identifier)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
}

/// Keep/drop decision for one untrimmed line. Retention wins over exclusion.
pub fn keep_line(line: &str, profile: &DocumentProfile) -> bool {
    if profile.retention().is_match(line) {
        return true;
    }
    !profile.exclusion().is_match(line)
}

fn filter_lines<'a>(raw: &'a str, profile: &DocumentProfile) -> Vec<&'a str> {
    raw.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || !keep_line(line, profile) {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | '_')
}

/// Turn a captured name into a filename token.
///
/// Letters are uppercased, runs of whitespace / `,` / `.` / `_` become a
/// single `_`, everything else is dropped. Idempotent.
pub fn normalize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = false;

    for c in raw.chars() {
        if c.is_alphabetic() {
            out.extend(c.to_uppercase());
            last_was_sep = false;
        } else if is_separator(c) && !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }

    if out.ends_with('_') {
        out.pop();
    }
    out
}

/// Collapse blank runs to one space, keep explicit line breaks, and
/// strip spaces on either side of each break.
fn normalize_whitespace(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last_was_space = false;

    for c in body.chars() {
        if c == '\n' {
            while out.ends_with(' ') {
                out.pop();
            }
            out.push('\n');
            last_was_space = true;
        } else if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DocumentProfile {
        DocumentProfile::builder("test")
            .capture([r"Sig\./Sig\.ra:\s+([A-Za-z][A-Za-z\s]+?)(?:\s{2,}|ID)"])
            .exclude([r"\d{2}/\d{2}/\d{4}", r"Tel\."])
            .retain(["CONCLUSIONI"])
            .section_break(["CONCLUSIONI"])
            .build()
    }

    #[test]
    fn rejects_empty_input() {
        let engine = RedactionEngine::new();
        assert_eq!(engine.process("", &profile()), Err(RedactionError::EmptyInput));
    }

    #[test]
    fn captures_and_normalizes_identifier() {
        let raw = "Sig./Sig.ra: MARIO ROSSI   ID Paziente: 123\nEsame eseguito.";
        let report = RedactionEngine::new().process(raw, &profile()).unwrap();
        assert_eq!(report.identifier, "MARIO_ROSSI");
        assert_eq!(report.profile_name, "test");
    }

    #[test]
    fn missing_identifier_uses_sentinel() {
        let report = RedactionEngine::new()
            .process("solo testo clinico", &profile())
            .unwrap();
        assert_eq!(report.identifier, UNKNOWN_SUBJECT);
    }

    #[test]
    fn retention_beats_exclusion() {
        let raw = "Data: 01/01/2020 CONCLUSIONI: normale\nData: 02/02/2020\nTel. 030 000";
        let report = RedactionEngine::new().process(raw, &profile()).unwrap();
        assert_eq!(report.body, "Data: 01/01/2020\nCONCLUSIONI: normale");
    }

    #[test]
    fn reflows_lines_into_one_paragraph() {
        let raw = "  Il parenchima polmonare\n\n   appare   normalmente\t\tespanso.  \n";
        let report = RedactionEngine::new().process(raw, &profile()).unwrap();
        assert_eq!(report.body, "Il parenchima polmonare appare normalmente espanso.");
    }

    #[test]
    fn section_breaks_apply_to_every_match() {
        let p = DocumentProfile::builder("breaks")
            .section_break(["ARTERIE"])
            .build();
        let raw = "Carotide regolare. ARTERIE VERTEBRALI pervie.\nARTERIE SUCCLAVIE pervie.";
        let report = RedactionEngine::new().process(raw, &p).unwrap();
        assert_eq!(
            report.body,
            "Carotide regolare.\nARTERIE VERTEBRALI pervie.\nARTERIE SUCCLAVIE pervie."
        );
    }

    #[test]
    fn break_at_start_is_trimmed() {
        let p = DocumentProfile::builder("breaks")
            .section_break(["CONCLUSIONI"])
            .build();
        let report = RedactionEngine::new().process("CONCLUSIONI ok", &p).unwrap();
        assert_eq!(report.body, "CONCLUSIONI ok");
    }

    #[test]
    fn whitespace_only_input_is_an_empty_body() {
        let report = RedactionEngine::new().process(" \n\t\n", &profile()).unwrap();
        assert_eq!(report.body, "");
    }

    #[test]
    fn normalize_identifier_rules() {
        assert_eq!(normalize_identifier("Rossi, Mario"), "ROSSI_MARIO");
        assert_eq!(normalize_identifier("  de   la Cruz. "), "DE_LA_CRUZ");
        assert_eq!(normalize_identifier("Nicolò D'Amico"), "NICOLÒ_DAMICO");
        assert_eq!(normalize_identifier("123"), "");
        assert_eq!(normalize_identifier("MARIO_ROSSI"), "MARIO_ROSSI");
    }

    #[test]
    fn non_letter_capture_falls_back_to_sentinel() {
        let p = DocumentProfile::builder("ids")
            .capture([r"ID:\s+(\d+)"])
            .build();
        let report = RedactionEngine::new().process("ID: 4711", &p).unwrap();
        assert_eq!(report.identifier, UNKNOWN_SUBJECT);
    }
}
