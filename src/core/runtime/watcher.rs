use std::{
    fmt, io,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use ignore::WalkBuilder;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use watchexec::{
    Watchexec,
    error::{CriticalError, FsWatcherError, RuntimeError},
};
use watchexec_events::{
    Event, FileType, Tag,
    filekind::{FileEventKind, ModifyKind},
};
use watchexec_filterer_ignore::IgnoreFilterer;
use watchexec_signals::Signal;

use super::session::{SessionSender, ShutdownReason};
use crate::core::git::relative_to_workdir;

/// Directory names never watched, at any depth. Dot-prefixed names are excluded separately.
const EXCLUDED_DIRS: &[&str] = &["node_modules"];

/// Globs handed to the ignore filterer, relative to the watch root.
const HARD_EXCLUDES: &[&str] = &["/.git", ".*", "node_modules"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// One changed file, with its path relative to the repository work tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory being watched; may be a subdirectory of `workdir`.
    pub root: PathBuf,
    /// Repository work tree root, used to relativize paths.
    pub workdir: PathBuf,
    pub debounce: Duration,
}

/// Whether `path` falls under a hidden entry or `node_modules` below `root`.
#[must_use]
pub fn is_excluded(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return true;
    };
    rel.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
        }
        _ => false,
    })
}

/// Turn one watchexec event into file changes, dropping access-only events and
/// excluded paths. A created or renamed-in directory is walked so files written
/// before its watch was registered are still reported.
#[must_use]
pub fn classify(opts: &WatchOptions, event: &Event) -> Vec<FileChange> {
    let kind = event.tags.iter().find_map(|t| match t {
        Tag::FileEventKind(k) => Some(k),
        _ => None,
    });
    if matches!(kind, Some(FileEventKind::Access(_))) {
        return Vec::new();
    }

    let mut changes = Vec::new();
    for (path, file_type) in event.paths() {
        if is_excluded(&opts.root, path) {
            continue;
        }
        if matches!(file_type, Some(FileType::Dir)) || path.is_dir() {
            if matches!(
                kind,
                Some(FileEventKind::Create(_) | FileEventKind::Modify(ModifyKind::Name(_)))
            ) {
                changes.extend(files_under(opts, path));
            }
            continue;
        }
        let Some(rel) = relative_to_workdir(&opts.workdir, path) else {
            continue;
        };
        let exists = path.exists();
        let change_kind = match kind {
            Some(FileEventKind::Create(_)) => ChangeKind::Added,
            Some(FileEventKind::Remove(_)) => ChangeKind::Removed,
            Some(FileEventKind::Modify(ModifyKind::Name(_))) if exists => ChangeKind::Added,
            _ if !exists => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        };
        changes.push(FileChange {
            kind: change_kind,
            path: rel,
        });
    }
    changes
}

// Hidden entries and gitignored files are skipped by the walker itself.
fn files_under(opts: &WatchOptions, dir: &Path) -> Vec<FileChange> {
    WalkBuilder::new(dir)
        .hidden(true)
        .parents(true)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| !is_excluded(&opts.root, entry.path()))
        .filter_map(|entry| relative_to_workdir(&opts.workdir, entry.path()))
        .map(|path| FileChange {
            kind: ChangeKind::Added,
            path,
        })
        .collect()
}

/// Whether a watcher error only reports a path that vanished before it could be
/// watched or read, which happens routinely while git rewrites files.
#[must_use]
pub fn is_vanished_path(err: &RuntimeError) -> bool {
    let RuntimeError::FsWatcher { err, .. } = err else {
        return false;
    };
    match err {
        FsWatcherError::PathScan { err, .. } => err.kind() == io::ErrorKind::NotFound,
        FsWatcherError::Event(e)
        | FsWatcherError::PathAdd { err: e, .. }
        | FsWatcherError::PathRemove { err: e, .. } => match &e.kind {
            notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound => true,
            notify::ErrorKind::Io(source) => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        },
        _ => false,
    }
}

/// Start watching `opts.root`, posting every change to the session.
///
/// SIGINT and SIGTERM received by the process are forwarded as shutdown requests.
///
/// # Errors
/// Returns an error if the ignore filter or the watch cannot be set up.
pub async fn spawn(opts: WatchOptions, sender: SessionSender) -> Result<WatchHandle> {
    let filterer = build_filterer(&opts.root)
        .await
        .context("failed to build ignore filter")?;

    let config = watchexec::Config::default();
    let handler_opts = Arc::new(opts.clone());
    config.on_action(move |mut action| {
        let signals: Vec<Signal> = action.signals().collect();
        if signals
            .iter()
            .any(|s| matches!(s, Signal::Interrupt | Signal::Terminate))
        {
            info!(event = "shutdown_signal", "received shutdown signal");
            sender.shutdown(ShutdownReason::Signal);
            action.quit();
            return action;
        }

        for event in action.events.iter() {
            for change in classify(&handler_opts, event) {
                info!(
                    event = "fs_change",
                    kind = %change.kind,
                    path = %change.path,
                    "File {} has been {}",
                    change.path,
                    change.kind
                );
                sender.changed(change);
            }
        }
        action
    });

    config.pathset([opts.root.clone()]);
    config.filterer(filterer);
    config.throttle(opts.debounce);
    config.on_error(|err: watchexec::ErrorHook| {
        if is_vanished_path(&err.error) {
            debug!(event = "watchexec_error", "watchexec error: {}", err.error);
        } else {
            tracing::error!(event = "watchexec_error", "watchexec error: {}", err.error);
        }
    });

    let wx = Watchexec::with_config(config).context("failed to create watchexec")?;
    info!(event = "watch_start", path = %opts.root.display(), "watching");

    let main = wx.main();
    Ok(WatchHandle { _wx: wx, main })
}

/// Running watch. Dropping the handle leaves the watch running; call [`WatchHandle::stop`].
pub struct WatchHandle {
    _wx: Watchexec,
    main: JoinHandle<Result<(), CriticalError>>,
}

impl WatchHandle {
    pub fn stop(&self) {
        self.main.abort();
    }
}

// Project ignore files (.gitignore, .git/info/exclude) plus the fixed excludes.
async fn build_filterer(root: &Path) -> Result<IgnoreFilterer> {
    let (mut files, origin_errors) = ignore_files::from_origin(root).await;
    for e in origin_errors {
        debug!(error = %e, "skipping unreadable ignore file");
    }
    if !files.iter().any(|f| f.applies_in.is_none()) {
        let (env_files, _) = ignore_files::from_environment(None).await;
        files.extend(env_files);
    }
    debug!(count = files.len(), "loaded ignore files");

    let mut filter = ignore_files::IgnoreFilter::new(root, &files)
        .await
        .map_err(|e| anyhow!("ignore filter build failed: {e}"))?;
    filter
        .add_globs(HARD_EXCLUDES, Some(&root.to_path_buf()))
        .map_err(|e| anyhow!("ignore hard excludes failed: {e}"))?;
    Ok(IgnoreFilterer(filter))
}
