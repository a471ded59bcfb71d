// Interactive first-run setup
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::config::AppConfig;
use crate::enrichment::CommandEnricher;
use crate::extraction::PdfToText;

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}\n> ")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).context("failed to read answer")? == 0 {
        bail!("setup aborted: no input");
    }
    Ok(line.trim().to_string())
}

fn ask_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: bool,
) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = ask(input, output, &format!("{question} {hint}"))?;
    Ok(match answer.to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" | "s" | "si" => true,
        _ => false,
    })
}

/// Ask for the settings a first run needs, starting from `base`.
///
/// The watch directory must exist. An unknown output directory falls back
/// to the watch directory with a warning.
pub fn run_setup<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    base: AppConfig,
) -> Result<AppConfig> {
    let mut config = base;

    writeln!(output, "\n========================================")?;
    writeln!(output, "  REPORT MONITOR - Setup")?;
    writeln!(output, "========================================\n")?;

    if !PdfToText::new(&config.pdftotext_path).is_available() {
        writeln!(
            output,
            "warning: '{}' not found. Install poppler-utils (pdftotext) before watching.\n",
            config.pdftotext_path.display()
        )?;
    }

    let watch = ask(input, output, "Directory to watch for new PDFs:")?;
    let watch = PathBuf::from(watch);
    if watch.as_os_str().is_empty() || !watch.is_dir() {
        bail!("not a directory: {}", watch.display());
    }
    config.watch_dir = watch;

    let out = ask(
        input,
        output,
        "\nDirectory for the .txt files (Enter to use the watch directory):",
    )?;
    config.output_dir = if out.is_empty() {
        None
    } else if PathBuf::from(&out).is_dir() {
        Some(PathBuf::from(out))
    } else {
        writeln!(output, "warning: directory not found, using the watch directory")?;
        None
    };

    config.clipboard = ask_yes_no(input, output, "\nCopy each report to the clipboard?", config.clipboard)?;

    config.enrichment.enabled = ask_yes_no(
        input,
        output,
        "\nSend cleaned reports to the analysis assistant?",
        config.enrichment.enabled,
    )?;
    if config.enrichment.enabled
        && !CommandEnricher::new(&config.enrichment.command, Vec::new()).is_available()
    {
        writeln!(
            output,
            "warning: '{}' is not installed; reports will be saved without analysis",
            config.enrichment.command
        )?;
    }

    Ok(config)
}
