// Folder watcher: turns OS change events into one notification per new PDF
//
// A dedicated thread runs a current-thread tokio runtime. The loop waits on
// exactly two sources, the stop signal and the event channel fed by notify,
// and processes arrivals one at a time in detection order.
pub mod dedup;

use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc as tokio_mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

pub use dedup::{Decision, WatchPolicy, WatchState};

/// Only files with this extension (any case) are reported.
pub const TARGET_EXTENSION: &str = "pdf";

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("invalid directory: {0}")]
    InvalidDirectory(PathBuf),

    #[error("cannot subscribe to changes in {path}: {source}")]
    SubscriptionFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to start watch task: {0}")]
    Runtime(#[from] std::io::Error),
}

pub fn has_target_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TARGET_EXTENSION))
}

/// Paths in `event` that may be a newly added or rewritten target file.
///
/// A rename contributes only its destination; removals, attribute
/// changes and the source half of a rename contribute nothing.
pub fn arrivals(event: &Event) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match &event.kind {
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().into_iter().collect()
        }
        // chmod, chown and xattr changes leave the content alone
        EventKind::Modify(ModifyKind::Metadata(kind)) if kind != &MetadataKind::WriteTime => {
            Vec::new()
        }
        EventKind::Modify(_) => event.paths.iter().collect(),
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|p| has_target_extension(p))
        .cloned()
        .collect()
}

/// True if the file exists and can be opened for reading right now.
fn is_ready(path: &Path) -> bool {
    match File::open(path).and_then(|f| f.metadata()) {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "file not readable yet, dropping event");
            false
        }
    }
}

struct WatchTask<F> {
    state: Arc<WatchState>,
    events: tokio_mpsc::UnboundedReceiver<notify::Result<Event>>,
    on_arrival: F,
}

impl<F> WatchTask<F>
where
    F: FnMut(&Path) + Send + 'static,
{
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;

                _ = &mut stop => {
                    debug!("stop requested");
                    break;
                }

                received = self.events.recv() => match received {
                    Some(Ok(event)) => {
                        for path in arrivals(&event) {
                            self.consider(path).await;
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "change notification error"),
                    None => {
                        warn!("change notification stream closed");
                        break;
                    }
                },
            }
        }
    }

    async fn consider(&mut self, path: PathBuf) {
        if self.state.check_and_record(&path, Instant::now()) == Decision::Suppressed {
            trace!(path = %path.display(), "duplicate event suppressed");
            return;
        }

        // Heuristic: give the writer time to finish. Not a guarantee.
        tokio::time::sleep(self.state.policy().grace).await;

        if !is_ready(&path) {
            return;
        }

        info!(path = %path.display(), "new file detected");
        let callback = AssertUnwindSafe(|| (self.on_arrival)(&path));
        if panic::catch_unwind(callback).is_err() {
            error!(path = %path.display(), "arrival handler panicked");
        }
    }
}

/// Entry point for starting a watch on one directory.
pub struct ChangeWatcher;

impl ChangeWatcher {
    /// Watch `dir` (non-recursive) and call `on_arrival` once per new PDF.
    ///
    /// The callback runs on the watch thread, so documents are handled one
    /// at a time in the order they were detected.
    pub fn start<F>(dir: &Path, policy: WatchPolicy, on_arrival: F) -> Result<WatchHandle, WatchError>
    where
        F: FnMut(&Path) + Send + 'static,
    {
        if !dir.is_dir() {
            return Err(WatchError::InvalidDirectory(dir.to_path_buf()));
        }
        let directory = dir
            .canonicalize()
            .map_err(|_| WatchError::InvalidDirectory(dir.to_path_buf()))?;

        let (event_tx, event_rx) = tokio_mpsc::unbounded_channel();
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| {
                // receiver gone means the task is shutting down
                let _ = event_tx.send(res);
            })
            .map_err(|source| WatchError::SubscriptionFailed {
                path: directory.clone(),
                source,
            })?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::SubscriptionFailed {
                path: directory.clone(),
                source,
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let state = Arc::new(WatchState::new(policy));
        let task = WatchTask {
            state: Arc::clone(&state),
            events: event_rx,
            on_arrival,
        };
        let (stop_tx, stop_rx) = oneshot::channel();

        let thread = thread::Builder::new()
            .name("report-watch".to_string())
            .spawn(move || {
                runtime.block_on(task.run(stop_rx));
                // unsubscribes from the OS before the thread exits
                drop(watcher);
            })?;

        info!(dir = %directory.display(), "watching for new reports");
        Ok(WatchHandle {
            directory,
            state,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Like [`ChangeWatcher::start`], delivering paths over a channel.
    pub fn start_channel(
        dir: &Path,
        policy: WatchPolicy,
    ) -> Result<(WatchHandle, mpsc::Receiver<PathBuf>), WatchError> {
        let (tx, rx) = mpsc::channel();
        let handle = Self::start(dir, policy, move |path| {
            let _ = tx.send(path.to_path_buf());
        })?;
        Ok((handle, rx))
    }
}

/// Owner of a running watch. Dropping it stops the watch.
pub struct WatchHandle {
    directory: PathBuf,
    state: Arc<WatchState>,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Signal the watch task and wait for it to exit. Safe to call twice.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(dir = %self.directory.display(), "watch thread panicked");
            }
            info!(dir = %self.directory.display(), "watch stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of paths currently held for duplicate suppression.
    pub fn tracked_paths(&self) -> usize {
        self.state.len()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_target_extension(Path::new("/in/a.pdf")));
        assert!(has_target_extension(Path::new("/in/SCAN.PDF")));
        assert!(!has_target_extension(Path::new("/in/a.pdf.part")));
        assert!(!has_target_extension(Path::new("/in/pdf")));
    }

    #[test]
    fn create_and_write_events_are_arrivals() {
        let created = event(EventKind::Create(CreateKind::File), &["/in/a.pdf", "/in/b.txt"]);
        assert_eq!(arrivals(&created), vec![PathBuf::from("/in/a.pdf")]);

        let written = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/in/a.PDF"],
        );
        assert_eq!(arrivals(&written), vec![PathBuf::from("/in/a.PDF")]);
    }

    #[test]
    fn rename_yields_destination_only() {
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/in/upload.tmp.pdf", "/in/final.pdf"],
        );
        assert_eq!(arrivals(&both), vec![PathBuf::from("/in/final.pdf")]);

        let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/in/x.pdf"]);
        assert!(arrivals(&from).is_empty());

        let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/in/x.pdf"]);
        assert_eq!(arrivals(&to), vec![PathBuf::from("/in/x.pdf")]);
    }

    #[test]
    fn attribute_changes_are_not_arrivals() {
        for kind in [
            MetadataKind::Any,
            MetadataKind::Permissions,
            MetadataKind::Ownership,
            MetadataKind::Extended,
        ] {
            let changed = event(EventKind::Modify(ModifyKind::Metadata(kind)), &["/in/a.pdf"]);
            assert!(arrivals(&changed).is_empty(), "{kind:?}");
        }

        let touched = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/in/a.pdf"],
        );
        assert_eq!(arrivals(&touched), vec![PathBuf::from("/in/a.pdf")]);
    }

    #[test]
    fn removals_are_ignored() {
        let removed = event(EventKind::Remove(RemoveKind::File), &["/in/a.pdf"]);
        assert!(arrivals(&removed).is_empty());
    }

    #[test]
    fn start_rejects_missing_directory() {
        let result = ChangeWatcher::start(
            Path::new("/definitely/not/here"),
            WatchPolicy::default(),
            |_| {},
        );
        assert!(matches!(result, Err(WatchError::InvalidDirectory(_))));
    }
}
