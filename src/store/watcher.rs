//! Polling change-detection bus.
//!
//! Watches workspace directories for new or rewritten JSON documents and
//! invokes a callback per changed entry. Polling (rather than inotify or
//! kqueue) is deliberate: the same mechanism works on every filesystem the
//! workers might share, at the cost of event latency bounded by the poll
//! interval.
//!
//! Each watched directory runs as one spawned task: baseline scan first,
//! then scan-diff-replace on every interval tick. The scan body runs to
//! completion before the next tick fires, so a single directory is never
//! scanned reentrantly. Events for entries modified within one poll window
//! arrive in directory-enumeration order, which need not match causal
//! order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::hlog_debug;
use crate::store::is_document;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Snapshot of a directory: document name -> last-modified time.
pub type Scan = HashMap<String, SystemTime>;

/// Scan a directory for documents. Missing directory reads as empty; an
/// entry that disappears between readdir and stat is skipped.
pub fn scan_dir(dir: &Path) -> Scan {
    let mut out = Scan::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return out,
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_document(&name) {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            if let Ok(mtime) = meta.modified() {
                out.insert(name, mtime);
            }
        }
    }
    out
}

/// Entries that are newly present or whose mtime advanced since `prev`.
/// Entries missing from `next` are dropped silently (no deleted events).
pub fn diff_scans(prev: &Scan, next: &Scan) -> Vec<String> {
    let mut changed: Vec<String> = next
        .iter()
        .filter(|(name, mtime)| match prev.get(*name) {
            None => true,
            Some(prev_mtime) => prev_mtime < mtime,
        })
        .map(|(name, _)| name.clone())
        .collect();
    changed.sort();
    changed
}

/// Poll-based directory watcher.
///
/// One instance can watch multiple independent directories. `stop()`
/// cancels and aborts every watch task; afterwards no callback runs.
pub struct Watcher {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Watcher {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Watch a directory, invoking `callback` once per changed document.
    ///
    /// Performs an immediate baseline scan; only changes after that are
    /// reported.
    pub fn watch<F>(&mut self, dir: PathBuf, interval: Duration, callback: F)
    where
        F: Fn(&str) + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let mut known = scan_dir(&dir);
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would re-report the baseline window
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let current = scan_dir(&dir);
                        for name in diff_scans(&known, &current) {
                            hlog_debug!("watcher: detected change {}", name);
                            callback(&name);
                        }
                        known = current;
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Stop all watch tasks. No callback runs after this returns.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}
