use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use git_autocommit::core::git::{self, GitGateway, REMOTE, VersionControl};
use git_autocommit::core::runtime::cycle::CommitPrompt;
use git_autocommit::core::runtime::session::{MonitoringSession, ShutdownReason};
use git_autocommit::core::runtime::watcher::{self, WatchOptions};
use git2::Repository;
use tempfile::TempDir;

struct SilentPrompt;

impl CommitPrompt for SilentPrompt {
    fn read_message(&self) -> Result<String> {
        Ok(String::new())
    }
}

fn init_repo(root: &Path, origin: &Path) -> Result<()> {
    Repository::init_bare(origin)?;
    let repo = Repository::init(root)?;
    let mut cfg = repo.config()?;
    cfg.set_str("user.name", "Test")?;
    cfg.set_str("user.email", "test@example.com")?;
    repo.remote(REMOTE, origin.to_str().unwrap())?;
    Ok(())
}

fn head_message(root: &Path) -> Option<String> {
    let repo = Repository::open(root).ok()?;
    let commit = repo.head().ok()?.peel_to_commit().ok()?;
    commit.message().map(str::to_string)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_watch_lists_only_included_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let origin = TempDir::new()?;
    init_repo(temp_dir.path(), origin.path())?;
    let layout = git::discover(temp_dir.path())?;
    let root = layout.workdir.clone();

    // Present before the watch starts; must not be reported
    fs::write(root.join("before.txt"), "old")?;

    let vcs: Arc<dyn VersionControl> = Arc::new(GitGateway::new(&root));
    let (session, tx) = MonitoringSession::new(vcs, Arc::new(SilentPrompt));
    let running = tokio::spawn(session.run());

    let watch = watcher::spawn(
        WatchOptions {
            root: root.clone(),
            workdir: root.clone(),
            debounce: Duration::from_millis(50),
        },
        tx.clone(),
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    fs::write(root.join("kept.txt"), "kept")?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src").join("new.rs"), "fn main() {}")?;
    fs::write(root.join(".env"), "SECRET=1")?;
    fs::create_dir_all(root.join(".cache"))?;
    fs::write(root.join(".cache").join("blob"), "x")?;
    fs::create_dir_all(root.join("node_modules").join("pkg"))?;
    fs::write(root.join("node_modules").join("pkg").join("index.js"), "x")?;
    fs::write(layout.git_dir.join("scratch"), "x")?;

    // Let the throttled events reach the session before flushing
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(tx.tick());

    let mut message = None;
    for _ in 0..100 {
        message = head_message(&root);
        if message.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    watch.stop();
    assert!(tx.shutdown(ShutdownReason::CancelKey));
    let end = running.await?;
    assert_eq!(end.reason, ShutdownReason::CancelKey);

    let message = message.expect("automatic commit was created");
    let (header, files) = message
        .split_once("\n\nChanged files:\n")
        .expect("message lists changed files");
    assert!(header.starts_with("Auto-commit: "), "{message}");
    assert_eq!(files.lines().collect::<Vec<_>>(), vec!["kept.txt", "src/new.rs"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn changes_wait_in_session_until_flushed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let origin = TempDir::new()?;
    init_repo(temp_dir.path(), origin.path())?;
    let root = git::discover(temp_dir.path())?.workdir;

    let vcs: Arc<dyn VersionControl> = Arc::new(GitGateway::new(&root));
    let (session, tx) = MonitoringSession::new(vcs, Arc::new(SilentPrompt));
    let running = tokio::spawn(session.run());

    let watch = watcher::spawn(
        WatchOptions {
            root: root.clone(),
            workdir: root.clone(),
            debounce: Duration::from_millis(50),
        },
        tx.clone(),
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    fs::write(root.join("a.txt"), "a")?;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    fs::write(root.join("a.txt"), "a2")?;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    watch.stop();
    tx.shutdown(ShutdownReason::Signal);
    let end = running.await?;

    // No tick was sent, so nothing was committed and the path is still pending once
    assert_eq!(end.reason, ShutdownReason::Signal);
    assert_eq!(end.pending.iter().collect::<Vec<_>>(), vec!["a.txt"]);
    assert!(head_message(&root).is_none());
    Ok(())
}
