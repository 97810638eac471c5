//! File system watcher for live rebuilds.
//!
//! Monitors `content/`, `layouts/` and `static/` and rebuilds the whole site
//! once changes settle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────── watch thread ────────────────┐     ┌──── build thread ────┐
//! │                                              │     │                      │
//! │  notify ──▶ event_loop() ──▶ Debouncer ──────┼─────▶  queue (capacity 1)  │
//! │  events        │              (500ms)  try_send    │        │             │
//! │                └─ new dir? watch it           │     │   build_site()      │
//! └──────────────────────────────────────────────┘     └──────────────────────┘
//! ```
//!
//! A rebuild requested while another is already queued is dropped: the queued
//! one will see the same files. A failed rebuild is reported and the previous
//! output stays published.

use crate::{
    build::build_site, config::SiteConfig, log, logger::RebuildStatus, output::OutputGate,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher, event::ModifyKind};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use walkdir::WalkDir;

/// How long the loop sleeps when nothing is pending.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || (name.starts_with('#') && name.ends_with('#'))
        || name == "4913"
}

/// Content changes, creations, removals and renames. Metadata-only changes
/// and accesses are not.
const fn is_relevant(event: &Event) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

fn rel_path<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

// =============================================================================
// Debounce State
// =============================================================================

/// Collects changed paths until no event arrived for `delay`.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    delay: Duration,
}

impl Debouncer {
    fn new(delay: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            delay,
        }
    }

    /// Record paths; restarts the timer if any path is not a temp file.
    fn add(&mut self, paths: impl IntoIterator<Item = PathBuf>, now: Instant) {
        let mut touched = false;
        for path in paths.into_iter().filter(|p| !is_temp_file(p)) {
            self.pending.insert(path);
            touched = true;
        }
        if touched {
            self.last_event = Some(now);
        }
    }

    fn ready(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| now.duration_since(t) >= self.delay)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    /// Time left until the timer fires, or the idle timeout.
    fn timeout(&self, now: Instant) -> Duration {
        match self.last_event {
            Some(t) if !self.pending.is_empty() => {
                self.delay.saturating_sub(now.duration_since(t))
            }
            _ => IDLE_TIMEOUT,
        }
    }
}

// =============================================================================
// Event Loop
// =============================================================================

/// Consume watcher events until the channel closes.
///
/// `on_new_dir` is called for every directory created at runtime; `fire` gets
/// the settled set of changed paths.
fn event_loop(
    rx: &Receiver<notify::Result<Event>>,
    debouncer: &mut Debouncer,
    mut on_new_dir: impl FnMut(&Path),
    mut fire: impl FnMut(Vec<PathBuf>),
) {
    loop {
        match rx.recv_timeout(debouncer.timeout(Instant::now())) {
            Ok(Ok(event)) => {
                if matches!(event.kind, EventKind::Create(_)) {
                    event
                        .paths
                        .iter()
                        .filter(|p| p.is_dir())
                        .for_each(|p| on_new_dir(p));
                }
                if is_relevant(&event) {
                    debouncer.add(event.paths, Instant::now());
                }
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) => {
                if debouncer.ready(Instant::now()) {
                    fire(debouncer.take());
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Watch `dir` and every directory below it, one non-recursive watch each.
fn watch_tree(watcher: &mut impl Watcher, dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
    {
        watcher
            .watch(entry.path(), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", entry.path().display()))?;
        count += 1;
    }
    Ok(count)
}

fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<()> {
    let root = &config.root;
    let mut watched = Vec::new();

    for dir in config.paths().sources() {
        if dir.is_dir() {
            let count = watch_tree(watcher, &dir)?;
            watched.push(format!("{}/ ({count} dirs)", rel_path(&dir, root).display()));
        }
    }

    if !watched.is_empty() {
        log!("watch"; "watching {}", watched.join(", "));
    }
    Ok(())
}

// =============================================================================
// Build Worker
// =============================================================================

/// Run `job` on a dedicated thread for each queued request.
///
/// The queue holds one request; see [`request_rebuild`].
fn spawn_worker<F>(mut job: F) -> Result<(SyncSender<Vec<PathBuf>>, JoinHandle<()>)>
where
    F: FnMut(Vec<PathBuf>) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<Vec<PathBuf>>(1);
    let handle = thread::Builder::new()
        .name("build".into())
        .spawn(move || {
            for changed in rx {
                job(changed);
            }
        })
        .context("Failed to spawn build worker")?;
    Ok((tx, handle))
}

/// Queue a rebuild unless one is already waiting.
///
/// Returns `false` if the request was coalesced or the worker is gone.
fn request_rebuild(queue: &SyncSender<Vec<PathBuf>>, changed: Vec<PathBuf>) -> bool {
    match queue.try_send(changed) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log!("watch"; "rebuild already queued");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            log!("watch"; "build worker stopped, change ignored");
            false
        }
    }
}

fn rebuild(
    config: &SiteConfig,
    gate: &OutputGate,
    changed: &[PathBuf],
    status: &mut RebuildStatus,
) {
    let trigger = changed
        .iter()
        .map(|p| rel_path(p, &config.root).display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    log!("watch"; "{trigger} changed, rebuild #{}...", status.count() + 1);

    let started = Instant::now();
    match build_site(config, gate) {
        Ok(report) => status.success(&format!(
            "rebuilt {} items in {}ms",
            report.items,
            started.elapsed().as_millis()
        )),
        Err(err) => status.error("rebuild failed, keeping previous output", &format!("{err:#}")),
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Start watching the source directories and rebuilding on change.
///
/// Creating the watcher and registering directories happen before this
/// returns, so their failures reach the caller. Events are then consumed on a
/// background `watch` thread for the rest of the process.
pub fn spawn_watcher(config: &'static SiteConfig, gate: &'static OutputGate) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let mut status = RebuildStatus::new();
    let (queue, _worker) = spawn_worker(move |changed| {
        rebuild(config, gate, &changed, &mut status);
    })?;

    let mut debouncer = Debouncer::new(Duration::from_millis(config.serve.debounce_ms));
    thread::Builder::new()
        .name("watch".into())
        .spawn(move || {
            event_loop(
                &rx,
                &mut debouncer,
                |dir| match watch_tree(&mut watcher, dir) {
                    Ok(_) => {
                        let rel = rel_path(dir, &config.root);
                        log!("watch"; "watching new directory {}", rel.display());
                    }
                    Err(e) => log!("watch"; "{e:#}"),
                },
                |changed| {
                    request_rebuild(&queue, changed);
                },
            );
        })
        .context("Failed to spawn watch thread")?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
