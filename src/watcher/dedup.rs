// Recently-notified paths, shared between the watch task and status queries
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);
pub const DEFAULT_SUPPRESSION: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10 * 60);

/// Timing knobs for a watcher instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    /// Wait after the first event before checking the file is readable.
    pub grace: Duration,
    /// Repeat events for a path inside this window are ignored.
    pub suppression: Duration,
    /// Entries older than this are purged.
    pub retention: Duration,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
            suppression: DEFAULT_SUPPRESSION,
            retention: DEFAULT_RETENTION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First sighting (or window elapsed); the path has been recorded.
    Notify,
    Suppressed,
}

#[derive(Debug)]
pub struct WatchState {
    policy: WatchPolicy,
    recently_seen: Mutex<HashMap<PathBuf, Instant>>,
}

impl WatchState {
    pub fn new(policy: WatchPolicy) -> Self {
        Self {
            policy,
            recently_seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &WatchPolicy {
        &self.policy
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<PathBuf, Instant>> {
        // the map stays consistent even if a holder panicked
        self.recently_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decide whether `path` should be notified at `now`, recording it
    /// before returning so a slow callback cannot cause a second notify.
    pub fn check_and_record(&self, path: &Path, now: Instant) -> Decision {
        let mut seen = self.seen();

        let retention = self.policy.retention;
        seen.retain(|_, at| now.saturating_duration_since(*at) <= retention);

        if let Some(at) = seen.get(path) {
            if now.saturating_duration_since(*at) < self.policy.suppression {
                return Decision::Suppressed;
            }
        }

        seen.insert(path.to_path_buf(), now);
        Decision::Notify
    }

    pub fn len(&self) -> usize {
        self.seen().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen().contains_key(path)
    }
}
