use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{
    process, scheduler,
    session::{MonitoringSession, SessionEnd},
    terminal::{RawModeGuard, TerminalPrompt},
    trigger::{Hotkeys, KeyListener, PlatformFamily},
    watcher::{self, WatchOptions},
};
use crate::config::AutocommitConfig;
use crate::core::git::{RepoLayout, VersionControl};

/// Guards against starting a second session while one is active.
#[derive(Debug, Default)]
pub struct Monitor {
    active: AtomicBool,
}

/// Marks the owning [`Monitor`] active until dropped.
#[derive(Debug)]
pub struct ActiveMonitor<'a> {
    monitor: &'a Monitor,
}

impl Monitor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Returns None if a session is already active on this monitor.
    pub fn try_begin(&self) -> Option<ActiveMonitor<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ActiveMonitor { monitor: self })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveMonitor<'_> {
    fn drop(&mut self) {
        self.monitor.active.store(false, Ordering::SeqCst);
    }
}

/// Process-wide monitor used by the CLI.
pub static MONITOR: Monitor = Monitor::new();

/// Everything a session needs to start.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Directory to watch.
    pub target: PathBuf,
    pub repo: RepoLayout,
    pub cfg: AutocommitConfig,
}

/// Run one monitoring session in the foreground until it is cancelled.
///
/// Returns without doing anything if `monitor` already has an active session.
///
/// # Errors
/// Returns an error if the repository lock is held elsewhere, or the runtime
/// or the watch cannot be set up.
pub fn start_foreground(
    monitor: &Monitor,
    opts: &StartOptions,
    vcs: Arc<dyn VersionControl>,
) -> Result<()> {
    let Some(_active) = monitor.try_begin() else {
        warn!(event = "already_monitoring", "Monitoring is already active!");
        return Ok(());
    };
    let _lock = process::acquire_lock(&opts.repo.git_dir)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = rt.block_on(run_session(opts, vcs));
    // An abandoned cycle may still be blocked on git or the prompt; do not wait for it.
    rt.shutdown_background();
    result
}

async fn run_session(opts: &StartOptions, vcs: Arc<dyn VersionControl>) -> Result<()> {
    info!(
        event = "monitor_start",
        path = %opts.target.display(),
        "Starting to monitor: {}",
        opts.target.display()
    );

    let (session, sender) = MonitoringSession::new(vcs, Arc::new(TerminalPrompt));

    let watch = watcher::spawn(
        WatchOptions {
            root: opts.target.clone(),
            workdir: opts.repo.workdir.clone(),
            debounce: Duration::from_millis(opts.cfg.debounce_ms),
        },
        sender.clone(),
    )
    .await
    .context("failed to establish watch")?;

    let interval = Duration::from_millis(opts.cfg.interval_ms);
    let timer = scheduler::spawn(interval, sender.clone());

    let raw = RawModeGuard::acquire()?;
    let keys = if raw.is_active() {
        let hotkeys = Hotkeys::for_platform(PlatformFamily::current());
        info!(
            "Committing every {interval:?}. Press {} to commit now, Ctrl+C to stop.",
            hotkeys.manual_label
        );
        Some(KeyListener::spawn(hotkeys, sender.clone()))
    } else {
        info!("Committing every {interval:?}. Send SIGINT or SIGTERM to stop.");
        None
    };
    drop(sender);

    let SessionEnd { reason, pending } = session.run().await;

    watch.stop();
    timer.abort();
    drop(keys);
    drop(raw);

    info!(event = "monitor_stop", %reason, "Stopping monitoring...");
    if !pending.is_empty() {
        warn!(
            pending = pending.len(),
            "{} uncommitted change(s) left in the working tree",
            pending.len()
        );
    }
    Ok(())
}
