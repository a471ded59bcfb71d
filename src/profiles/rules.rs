// Compiled rule sets. Every pattern is compiled on its own: a bad one is
// dropped and reported, the rest of the set keeps working.
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("pattern `{pattern}` does not compile: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("capture pattern `{pattern}` has {found} capture groups, expected exactly 1")]
    CaptureGroups { pattern: String, found: usize },
}

impl RuleError {
    pub fn pattern(&self) -> &str {
        match self {
            RuleError::Invalid { pattern, .. } | RuleError::CaptureGroups { pattern, .. } => pattern,
        }
    }
}

fn compile_one(pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::Invalid {
            pattern: pattern.to_string(),
            source,
        })
}

/// An ordered set of line patterns (exclusion, retention, section breaks).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Regex>,
    rejected: Vec<RuleError>,
}

impl RuleSet {
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = RuleSet::default();
        for pattern in patterns {
            match compile_one(pattern.as_ref()) {
                Ok(re) => set.rules.push(re),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed rule");
                    set.rejected.push(e);
                }
            }
        }
        set
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.rules.iter().any(|re| re.is_match(line))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Regex> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rejected(&self) -> &[RuleError] {
        &self.rejected
    }
}

/// Ordered identifier capture patterns, each with exactly one group.
#[derive(Debug, Clone, Default)]
pub struct CaptureRules {
    rules: Vec<Regex>,
    rejected: Vec<RuleError>,
}

impl CaptureRules {
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = CaptureRules::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = compile_one(pattern).and_then(|re| {
                // captures_len counts the implicit whole-match group
                let found = re.captures_len() - 1;
                if found == 1 {
                    Ok(re)
                } else {
                    Err(RuleError::CaptureGroups {
                        pattern: pattern.to_string(),
                        found,
                    })
                }
            });
            match compiled {
                Ok(re) => set.rules.push(re),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed capture rule");
                    set.rejected.push(e);
                }
            }
        }
        set
    }

    /// First non-empty trimmed capture, in rule order.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.rules.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rejected(&self) -> &[RuleError] {
        &self.rejected
    }
}

/// Case-insensitive literal substrings; a text matches only if all are present.
#[derive(Debug, Clone, Default)]
pub struct IdentificationRules {
    needles: Vec<String>,
}

impl IdentificationRules {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// `lowered` must already be lowercased by the caller, so a catalog
    /// scan lowercases the document once instead of once per rule.
    pub fn all_found_in(&self, lowered: &str) -> bool {
        self.needles.iter().all(|n| lowered.contains(n.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.needles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_rule_is_skipped_not_fatal() {
        let set = RuleSet::compile(["Tel\\.", "([unclosed", "Fax\\."]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rejected().len(), 1);
        assert_eq!(set.rejected()[0].pattern(), "([unclosed");
        assert!(set.is_match("Fax. 030 123"));
        assert!(set.is_match("tel. 030 123"));
    }

    #[test]
    fn capture_rules_require_one_group() {
        let rules = CaptureRules::compile(["Paziente:\\s+\\w+", "Paziente:\\s+(\\w+)", "(a)(b)"]);
        assert_eq!(rules.len(), 1);
        assert!(matches!(
            rules.rejected()[0],
            RuleError::CaptureGroups { found: 0, .. }
        ));
        assert!(matches!(
            rules.rejected()[1],
            RuleError::CaptureGroups { found: 2, .. }
        ));
    }

    #[test]
    fn capture_skips_blank_groups() {
        let rules = CaptureRules::compile(["Nome:(\\s*)", "Paziente:\\s+([A-Z]+)"]);
        assert_eq!(rules.capture("Nome:   Paziente: ROSSI"), Some("ROSSI"));
        assert_eq!(rules.capture("nothing here"), None);
    }

    #[test]
    fn identification_is_case_insensitive_substring() {
        let rules = IdentificationRules::new(["Servizio di Diagnostica", "LUMEZZANE"]);
        let text = "istituto scientifico di lumezzane - servizio di diagnostica per immagini";
        assert!(rules.all_found_in(text));
        assert!(!rules.all_found_in("servizio di diagnostica"));
    }
}
