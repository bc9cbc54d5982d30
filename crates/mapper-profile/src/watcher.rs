//! Debounced filesystem watching for the device profile.
//!
//! The watcher observes one or more paths recursively and reacts to file
//! creations and modifications. Editors tend to write a file several times
//! per save, so events are coalesced behind a settle window: every relevant
//! event resets one pending timer, and only when the window elapses with no
//! further event does the reload callback fire, once per burst, with the
//! canonical profile path. The watcher never reads or parses the file; what
//! to do on change is entirely the callback's business.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::indexer::ProfileIndexer;

/// Settle window between the last observed write and the reload it triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Errors raised synchronously at watch setup; none of them ever lead to the
/// callback being invoked.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The watch set was empty.
    #[error("no paths given to watch")]
    InvalidArgument,

    /// A requested path does not exist.
    #[error("can't find path {}", .0.display())]
    PathNotFound(PathBuf),

    /// The underlying filesystem watch could not be established.
    #[error("failed to establish file watch: {0}")]
    Notify(#[from] notify::Error),
}

/// Handle over a running watch.
///
/// Dropping the handle releases the OS watch and ends the debounce task;
/// callers wanting the watch to last for the process lifetime simply keep
/// the handle alive. There is no explicit stop operation.
#[derive(Debug)]
pub struct ProfileWatcher {
    profile_path: PathBuf,
    _watcher: RecommendedWatcher,
    _task: tokio::task::JoinHandle<()>,
}

impl ProfileWatcher {
    /// Watch `paths` recursively and invoke `on_change(profile_path)` after
    /// writes settle for [`DEFAULT_DEBOUNCE`].
    ///
    /// Every path is validated before any watching begins. Must be called
    /// from within a tokio runtime.
    pub fn watch<I, F>(
        paths: I,
        profile_path: impl Into<PathBuf>,
        on_change: F,
    ) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = PathBuf>,
        F: Fn(&Path) + Send + Sync + 'static,
    {
        Self::watch_with_debounce(paths, profile_path, on_change, DEFAULT_DEBOUNCE)
    }

    /// [`watch`](Self::watch) with an explicit settle window.
    pub fn watch_with_debounce<I, F>(
        paths: I,
        profile_path: impl Into<PathBuf>,
        on_change: F,
        debounce: Duration,
    ) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = PathBuf>,
        F: Fn(&Path) + Send + Sync + 'static,
    {
        let paths: Vec<PathBuf> = paths.into_iter().collect();
        if paths.is_empty() {
            return Err(WatchError::InvalidArgument);
        }
        for path in &paths {
            if !path.exists() {
                return Err(WatchError::PathNotFound(path.clone()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )?;
        for path in &paths {
            watcher.watch(path, RecursiveMode::Recursive)?;
        }

        let profile_path = profile_path.into();
        let task = tokio::spawn(debounce_loop(
            rx,
            profile_path.clone(),
            Box::new(on_change),
            debounce,
        ));

        Ok(Self {
            profile_path,
            _watcher: watcher,
            _task: task,
        })
    }

    /// The canonical profile path handed to the reload callback.
    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }
}

/// Drain filesystem events, coalescing each burst into one callback.
async fn debounce_loop(
    mut events: mpsc::UnboundedReceiver<notify::Event>,
    profile_path: PathBuf,
    on_change: Box<dyn Fn(&Path) + Send + Sync>,
    debounce: Duration,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) if is_relevant(&event.kind) => {
                    tracing::debug!(paths = ?event.paths, "watched file changed, scheduling profile reload");
                    deadline = Some(Instant::now() + debounce);
                }
                Some(_) => {}
                // Watcher dropped; no more events can arrive.
                None => break,
            },
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                deadline = None;
                on_change(&profile_path);
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        // Unreachable: the select arm is guarded on `deadline.is_some()`.
        None => std::future::pending::<()>().await,
    }
}

/// Only creations and modifications count as profile changes.
fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Wire a watcher to an indexer: every settled change reloads the profile.
///
/// Read and parse failures are logged and swallowed so the previous snapshot
/// stays live; consumers only ever see stale data, never an error.
pub fn watch_and_reload<I>(
    indexer: Arc<ProfileIndexer>,
    paths: I,
    profile_path: impl Into<PathBuf>,
) -> Result<ProfileWatcher, WatchError>
where
    I: IntoIterator<Item = PathBuf>,
{
    watch_and_reload_with_debounce(indexer, paths, profile_path, DEFAULT_DEBOUNCE)
}

/// [`watch_and_reload`] with an explicit settle window.
pub fn watch_and_reload_with_debounce<I>(
    indexer: Arc<ProfileIndexer>,
    paths: I,
    profile_path: impl Into<PathBuf>,
    debounce: Duration,
) -> Result<ProfileWatcher, WatchError>
where
    I: IntoIterator<Item = PathBuf>,
{
    ProfileWatcher::watch_with_debounce(
        paths,
        profile_path,
        move |path| match indexer.reload(path) {
            Ok(violations) => {
                tracing::info!(
                    path = %path.display(),
                    violations = violations.len(),
                    "device profile reloaded"
                );
            }
            Err(err) => {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "device profile reload failed, keeping previous indices"
                );
            }
        },
        debounce,
    )
}
