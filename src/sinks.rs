// Output sinks for cleaned reports
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

const MAX_SUFFIX: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    File(PathBuf),
    Clipboard,
}

pub trait OutputSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, identifier: &str, text: &str) -> Result<Delivered>;
}

/// Writes `<identifier>.txt`, or `<identifier>_<n>.txt` when taken.
/// Existing files are never overwritten.
#[derive(Debug, Clone)]
pub struct TextFileSink {
    dir: PathBuf,
}

impl TextFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn candidate(&self, identifier: &str, n: u32) -> PathBuf {
        if n == 0 {
            self.dir.join(format!("{identifier}.txt"))
        } else {
            self.dir.join(format!("{identifier}_{n}.txt"))
        }
    }
}

impl OutputSink for TextFileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn deliver(&self, identifier: &str, text: &str) -> Result<Delivered> {
        for n in 0..MAX_SUFFIX {
            let path = self.candidate(identifier, n);
            // create_new makes the existence check and the create one step
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot create {}", path.display()))
                }
            };
            file.write_all(text.as_bytes())
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), "report saved");
            return Ok(Delivered::File(path));
        }
        bail!(
            "no free file name for '{}' in {}",
            identifier,
            self.dir.display()
        )
    }
}

/// Places the text on the system clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardSink;

impl OutputSink for ClipboardSink {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn deliver(&self, _identifier: &str, text: &str) -> Result<Delivered> {
        copy_to_clipboard(text)?;
        info!(chars = text.len(), "report copied to clipboard");
        Ok(Delivered::Clipboard)
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    use copypasta::{ClipboardContext, ClipboardProvider};
    let mut ctx = ClipboardContext::new()
        .map_err(|e| anyhow::anyhow!("Clipboard error: {}", e))?;
    ctx.set_contents(text.to_owned())
        .map_err(|e| anyhow::anyhow!("Clipboard error: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_files_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TextFileSink::new(dir.path());

        let first = sink.deliver("MARIO_ROSSI", "uno").unwrap();
        let second = sink.deliver("MARIO_ROSSI", "due").unwrap();
        let third = sink.deliver("MARIO_ROSSI", "tre").unwrap();

        assert_eq!(first, Delivered::File(dir.path().join("MARIO_ROSSI.txt")));
        assert_eq!(second, Delivered::File(dir.path().join("MARIO_ROSSI_1.txt")));
        assert_eq!(third, Delivered::File(dir.path().join("MARIO_ROSSI_2.txt")));
        assert_eq!(std::fs::read_to_string(dir.path().join("MARIO_ROSSI.txt")).unwrap(), "uno");
        assert_eq!(std::fs::read_to_string(dir.path().join("MARIO_ROSSI_2.txt")).unwrap(), "tre");
    }

    #[test]
    fn fills_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("X.txt"), "").unwrap();
        std::fs::write(dir.path().join("X_2.txt"), "").unwrap();

        let sink = TextFileSink::new(dir.path());
        assert_eq!(
            sink.deliver("X", "body").unwrap(),
            Delivered::File(dir.path().join("X_1.txt"))
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TextFileSink::new(dir.path().join("gone"));
        assert!(sink.deliver("X", "body").is_err());
    }
}
