//! The monitoring session: one loop that owns the change set and runs cycles.
//!
//! The watcher, the scheduler and the key listener never touch the change set
//! themselves. They hold a [`SessionSender`] and post messages; the loop applies
//! them one at a time, so a flush can never race an insert.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

use super::cycle::{self, CommitPrompt, CommitRequest, ManualOutcome};
use super::trigger::InputPause;
use super::watcher::FileChange;
use crate::core::changes::ChangeSet;
use crate::core::git::VersionControl;

#[derive(Debug)]
pub enum SessionMessage {
    Changed(FileChange),
    /// Scheduler interval elapsed.
    Tick,
    ManualCommit(InputPause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    CancelKey,
    Signal,
    /// Every sender was dropped.
    Closed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CancelKey => "cancel key",
            Self::Signal => "signal",
            Self::Closed => "all event sources closed",
        };
        f.write_str(s)
    }
}

/// Cloneable handle event sources use to reach the session.
/// Each method returns `false` once the session has stopped listening.
#[derive(Debug, Clone)]
pub struct SessionSender {
    inbox: UnboundedSender<SessionMessage>,
    shutdown: UnboundedSender<ShutdownReason>,
}

impl SessionSender {
    pub fn changed(&self, change: FileChange) -> bool {
        self.inbox.send(SessionMessage::Changed(change)).is_ok()
    }

    pub fn tick(&self) -> bool {
        self.inbox.send(SessionMessage::Tick).is_ok()
    }

    pub fn manual_commit(&self, pause: InputPause) -> bool {
        self.inbox.send(SessionMessage::ManualCommit(pause)).is_ok()
    }

    pub fn shutdown(&self, reason: ShutdownReason) -> bool {
        self.shutdown.send(reason).is_ok()
    }
}

/// What remained when the session loop returned.
#[derive(Debug)]
pub struct SessionEnd {
    pub reason: ShutdownReason,
    /// Changes observed but never flushed.
    pub pending: ChangeSet,
}

pub struct MonitoringSession {
    state: SessionState,
    inbox: UnboundedReceiver<SessionMessage>,
    shutdown: UnboundedReceiver<ShutdownReason>,
}

struct SessionState {
    changes: ChangeSet,
    vcs: Arc<dyn VersionControl>,
    prompt: Arc<dyn CommitPrompt>,
}

impl MonitoringSession {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        prompt: Arc<dyn CommitPrompt>,
    ) -> (Self, SessionSender) {
        let (inbox_tx, inbox) = unbounded_channel();
        let (shutdown_tx, shutdown) = unbounded_channel();
        let session = Self {
            state: SessionState {
                changes: ChangeSet::new(),
                vcs,
                prompt,
            },
            inbox,
            shutdown,
        };
        let sender = SessionSender {
            inbox: inbox_tx,
            shutdown: shutdown_tx,
        };
        (session, sender)
    }

    /// Process messages until shutdown is requested or every sender is gone.
    ///
    /// A shutdown request wins over queued messages and abandons a cycle in
    /// flight; pending changes are returned, not flushed.
    pub async fn run(self) -> SessionEnd {
        let Self {
            mut state,
            mut inbox,
            mut shutdown,
        } = self;

        let reason = loop {
            let message = tokio::select! {
                biased;
                reason = shutdown_requested(&mut shutdown) => break reason,
                message = inbox.recv() => match message {
                    Some(m) => m,
                    None => break ShutdownReason::Closed,
                },
            };

            tokio::select! {
                biased;
                reason = shutdown_requested(&mut shutdown) => break reason,
                () = state.handle(message) => {}
            }
        };

        SessionEnd {
            reason,
            pending: state.changes,
        }
    }
}

// Resolves on the next shutdown request; never resolves once all senders are
// dropped, so the inbox can still drain.
async fn shutdown_requested(rx: &mut UnboundedReceiver<ShutdownReason>) -> ShutdownReason {
    match rx.recv().await {
        Some(reason) => reason,
        None => std::future::pending().await,
    }
}

impl SessionState {
    async fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Changed(change) => {
                if self.changes.insert(change.path) {
                    debug!(pending = self.changes.len(), "change queued");
                }
            }
            SessionMessage::Tick => self.flush_automatic().await,
            SessionMessage::ManualCommit(pause) => self.flush_manual(pause).await,
        }
    }

    async fn flush_automatic(&mut self) {
        if self.changes.is_empty() {
            debug!(event = "tick_idle", "no pending changes");
            return;
        }

        // Taking the snapshot clears the set whether or not the cycle succeeds.
        let request = CommitRequest::automatic(cycle::iso8601_now(), self.changes.take());
        let vcs = Arc::clone(&self.vcs);
        match tokio::task::spawn_blocking(move || cycle::run_auto_cycle(vcs.as_ref(), &request))
            .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!(error = ?e, event = "commit_failed", "Error making commit or push: {e:#}");
            }
            Err(e) => error!(error = %e, event = "commit_failed", "commit task failed"),
        }
    }

    async fn flush_manual(&mut self, pause: InputPause) {
        info!(event = "manual_commit_start", "manual commit requested");
        let vcs = Arc::clone(&self.vcs);
        let prompt = Arc::clone(&self.prompt);
        let joined = tokio::task::spawn_blocking(move || {
            // Key input resumes when this closure returns.
            let _pause = pause;
            cycle::run_manual_cycle(vcs.as_ref(), prompt.as_ref())
        })
        .await;

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, event = "manual_commit_failed", "manual commit task failed");
                return;
            }
        };

        if outcome.flushed() {
            self.changes.clear();
        }
        report_manual(&outcome);
    }
}

fn report_manual(outcome: &ManualOutcome) {
    match outcome {
        ManualOutcome::Cancelled => {
            info!(event = "manual_commit_cancelled", "Commit cancelled: empty message");
        }
        ManualOutcome::StageFailed(e) => {
            error!(error = ?e, event = "manual_commit_failed", "Error staging changes: {e:#}");
        }
        ManualOutcome::PromptFailed(e) => {
            error!(error = ?e, event = "manual_commit_failed", "Error reading commit message: {e:#}");
        }
        ManualOutcome::NothingToCommit => {
            info!(event = "commit_skipped", "nothing to commit");
        }
        ManualOutcome::CommitFailed(e) => {
            error!(error = ?e, event = "manual_commit_failed", "Error making commit: {e:#}");
        }
        ManualOutcome::PushFailed { commit, error } => {
            warn!(
                %commit,
                event = "manual_push_failed",
                "Commit {commit} created but push failed: {error:#}. Push manually with `git push`."
            );
        }
        ManualOutcome::Pushed { commit, branch } => {
            info!(%commit, %branch, event = "push_done", "Commit created and pushed successfully");
        }
    }
}
