// Optional post-redaction analysis by an external assistant CLI
//
// The cleaned body is appended to a fixed instruction prompt and piped
// to the command's stdin; stdout is the enriched text. Any failure is
// reported to the caller, who keeps the cleaned body.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::extraction::{run_with_timeout, ExtractionError};

pub const DEFAULT_COMMAND: &str = "claude";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MIN_OUTPUT_CHARS: usize = 50;

const PROMPT: &str = "\
Sei un assistente medico che analizza referti italiani gia' ripuliti.
Produci un testo strutturato senza markdown, con queste sezioni:

REPERTI PATOLOGICI SIGNIFICATIVI
Un reperto per riga nel formato: (gravita') sintesi - \"citazione dal testo\".
Gravita': (+++) urgente, (++) da monitorare, (+) incidentale. Ordina dal piu' grave.
Se non ci sono reperti scrivi: Nessun reperto patologico significativo rilevato.

TESTO COMPLETO DEL REFERTO
Il corpo del referto in testo continuo: unisci le righe spezzate, vai a capo
solo tra frasi o sezioni, riporta i valori numerici esattamente, un farmaco per riga.

Data referto: GG/MM/AAAA
Medico: titolo nome cognome

Non riportare dati anagrafici, intestazioni, note legali o codici amministrativi.

---

TESTO DEL REFERTO DA ANALIZZARE:

";

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("nothing to analyze")]
    EmptyInput,

    #[error(transparent)]
    Command(#[from] ExtractionError),

    #[error("response too short ({chars} chars, need {min})")]
    TooShort { chars: usize, min: usize },
}

pub trait Enricher: Send + Sync {
    fn analyze(&self, text: &str) -> Result<String, EnrichmentError>;
}

#[derive(Debug, Clone)]
pub struct CommandEnricher {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    min_output_chars: usize,
}

impl Default for CommandEnricher {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND, vec!["--print".to_string()])
    }
}

impl CommandEnricher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
            min_output_chars: DEFAULT_MIN_OUTPUT_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_output_chars(mut self, min: usize) -> Self {
        self.min_output_chars = min;
        self
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn build_prompt(text: &str) -> String {
        let mut prompt = String::with_capacity(PROMPT.len() + text.len());
        prompt.push_str(PROMPT);
        prompt.push_str(text);
        prompt
    }
}

impl Enricher for CommandEnricher {
    fn analyze(&self, text: &str) -> Result<String, EnrichmentError> {
        if text.trim().is_empty() {
            return Err(EnrichmentError::EmptyInput);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let prompt = Self::build_prompt(text);
        debug!(program = %self.program, prompt_chars = prompt.len(), "sending report for analysis");

        let output = run_with_timeout(cmd, &self.program, Some(&prompt), self.timeout)?
            .into_stdout(&self.program)?;
        let output = output.trim();

        let chars = output.chars().count();
        if chars < self.min_output_chars {
            return Err(EnrichmentError::TooShort {
                chars,
                min: self.min_output_chars,
            });
        }

        info!(program = %self.program, chars, "analysis complete");
        Ok(output.to_string())
    }
}
