use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::debug;

use super::session::SessionSender;

/// Send a flush tick every `period`, starting one period from now,
/// until the session stops listening or the task is aborted.
pub fn spawn(period: Duration, sender: SessionSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            debug!(event = "tick", "flush interval elapsed");
            if !sender.tick() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::runtime::cycle::fakes::{FakeVcs, ScriptedPrompt};
    use crate::core::runtime::session::{MonitoringSession, ShutdownReason};
    use crate::core::runtime::watcher::{ChangeKind, FileChange};

    #[tokio::test(start_paused = true)]
    async fn flushes_only_after_full_interval() {
        let vcs = Arc::new(FakeVcs::default());
        let (session, tx) = MonitoringSession::new(vcs.clone(), Arc::new(ScriptedPrompt("")));
        let running = tokio::spawn(session.run());

        let timer = spawn(Duration::from_secs(60), tx.clone());
        tx.changed(FileChange {
            kind: ChangeKind::Added,
            path: "a.txt".into(),
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(vcs.commits().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        // Let the blocking cycle finish before checking.
        for _ in 0..100 {
            if !vcs.commits().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(vcs.commits().len(), 1);

        timer.abort();
        tx.shutdown(ShutdownReason::CancelKey);
        let end = running.await.unwrap();
        assert_eq!(end.reason, ShutdownReason::CancelKey);
    }
}
