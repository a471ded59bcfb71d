// Tracing setup for the CLI
use std::io::{self, Write};

use crossterm::terminal;
use tracing_subscriber::EnvFilter;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "report_monitor=debug"
    } else {
        "report_monitor=info"
    }
}

/// Stderr that still starts lines at column 0 while the terminal is in
/// raw mode (the watch loop reads single keypresses).
struct TerminalStderr;

impl Write for TerminalStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut err = io::stderr().lock();
        if terminal::is_raw_mode_enabled().unwrap_or(false) {
            for chunk in buf.split_inclusive(|b| *b == b'\n') {
                match chunk.strip_suffix(b"\n") {
                    Some(line) => {
                        err.write_all(line)?;
                        err.write_all(b"\r\n")?;
                    }
                    None => err.write_all(chunk)?,
                }
            }
        } else {
            err.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` overrides the
/// default filter. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))),
        )
        .with_writer(|| TerminalStderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_level() {
        assert_eq!(default_filter(false), "report_monitor=info");
        assert_eq!(default_filter(true), "report_monitor=debug");
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init_logging(false);
        init_logging(true);
    }

    #[test]
    fn writer_reports_full_length() {
        let mut w = TerminalStderr;
        assert_eq!(w.write(b"a\nb\n").unwrap(), 4);
    }
}
