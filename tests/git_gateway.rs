use std::fs;

use git_autocommit::core::git::{GitGateway, REMOTE, VersionControl};
use git_autocommit::core::runtime::cycle::{CommitRequest, CycleReport, run_auto_cycle};
use git2::Repository;
use tempfile::{TempDir, tempdir};

struct Fixture {
    work: TempDir,
    origin: TempDir,
    repo: Repository,
}

fn fixture() -> Fixture {
    let work = tempdir().unwrap();
    let origin = tempdir().unwrap();
    Repository::init_bare(origin.path()).unwrap();

    let repo = Repository::init(work.path()).unwrap();
    {
        let mut cfg = repo.config().unwrap();
        cfg.set_str("user.name", "Test").unwrap();
        cfg.set_str("user.email", "test@example.com").unwrap();
    }
    repo.remote(REMOTE, origin.path().to_str().unwrap()).unwrap();

    Fixture { work, origin, repo }
}

#[test]
fn stage_commit_and_push_reach_origin() {
    let fx = fixture();
    fs::write(fx.work.path().join("a.txt"), "hello").unwrap();

    let gw = GitGateway::new(fx.work.path());
    assert!(gw.is_initialized().unwrap());

    gw.stage_all().unwrap();
    gw.stage_path("a.txt").unwrap();
    let commit = gw.commit("first").unwrap().expect("commit created");
    assert!(!commit.is_empty());

    let branch = gw.current_branch().unwrap();
    gw.push(REMOTE, &branch).unwrap();

    let head = fx.repo.head().unwrap().peel_to_commit().unwrap();
    let origin = Repository::open_bare(fx.origin.path()).unwrap();
    let remote_ref = origin
        .find_reference(&format!("refs/heads/{branch}"))
        .unwrap();
    assert_eq!(remote_ref.target(), Some(head.id()));
}

#[test]
fn unchanged_tree_commits_nothing() {
    let fx = fixture();
    fs::write(fx.work.path().join("a.txt"), "hello").unwrap();

    let gw = GitGateway::new(fx.work.path());
    gw.stage_all().unwrap();
    assert!(gw.commit("first").unwrap().is_some());

    gw.stage_all().unwrap();
    assert!(gw.commit("again").unwrap().is_none());
}

#[test]
fn deleted_file_is_staged_as_removal() {
    let fx = fixture();
    let file = fx.work.path().join("gone.txt");
    fs::write(&file, "bye").unwrap();

    let gw = GitGateway::new(fx.work.path());
    gw.stage_all().unwrap();
    gw.commit("add").unwrap();

    fs::remove_file(&file).unwrap();
    gw.stage_path("gone.txt").unwrap();
    gw.commit("remove").unwrap().expect("removal commit");

    let tree = fx.repo.head().unwrap().peel_to_tree().unwrap();
    assert!(tree.get_name("gone.txt").is_none());
}

#[test]
fn auto_cycle_pushes_with_listed_files_in_message() {
    let fx = fixture();
    fs::write(fx.work.path().join("b.txt"), "x").unwrap();
    fs::write(fx.work.path().join("a.txt"), "y").unwrap();

    let gw = GitGateway::new(fx.work.path());
    let request = CommitRequest::automatic(
        "2026-01-01T00:00:00Z",
        vec!["a.txt".to_string(), "b.txt".to_string()],
    );
    let report = run_auto_cycle(&gw, &request).unwrap();
    assert!(matches!(report, CycleReport::Pushed { .. }));

    let head = fx.repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(
        head.message().unwrap(),
        "Auto-commit: 2026-01-01T00:00:00Z\n\nChanged files:\na.txt\nb.txt"
    );
}

#[test]
fn push_without_origin_reports_git_error() {
    let work = tempdir().unwrap();
    Repository::init(work.path()).unwrap();
    fs::write(work.path().join("a.txt"), "x").unwrap();

    let gw = GitGateway::new(work.path());
    gw.stage_all().unwrap();
    gw.commit("first").unwrap();
    let branch = gw.current_branch().unwrap();

    let err = gw.push(REMOTE, &branch).unwrap_err();
    assert!(format!("{err:#}").contains("push"));
}
