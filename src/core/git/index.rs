use std::path::Path;

use anyhow::{Context, Result};
use git2::{ErrorClass, ErrorCode, IndexAddOption, Repository};
use tracing::warn;

// Determine if a git2 error is likely a transient filesystem race
// where a file changed between stat and read during staging.
fn is_transient_fs_change(err: &git2::Error) -> bool {
    matches!(err.class(), ErrorClass::Filesystem)
        || matches!(err.code(), ErrorCode::Modified)
        || err
            .message()
            .to_lowercase()
            .contains("file changed before we could read it")
}

/// Stage every change in the working tree, including removals (`git add .`).
pub(crate) fn stage_all(repo: &Repository) -> Result<()> {
    with_retries(5, 50, || {
        let mut index = repo.index()?;
        index.add_all(["."].iter(), IndexAddOption::DEFAULT, None)?;
        // add_all skips deleted files; update_all drops their entries.
        index.update_all(["."].iter(), None)?;
        index.write()
    })
    .context("failed to stage working tree")
}

/// Stage a single work-tree-relative path. Missing paths are removed from the index.
pub(crate) fn stage_path(repo: &Repository, rel: &str) -> Result<()> {
    let workdir = repo
        .workdir()
        .context("repository has no working directory")?;
    let abs = workdir.join(rel);

    with_retries(5, 50, || {
        let mut index = repo.index()?;
        if abs.is_dir() {
            index.add_all([rel].iter(), IndexAddOption::DEFAULT, None)?;
        } else if abs.exists() {
            index.add_path(Path::new(rel))?;
        } else {
            index.remove_all([rel].iter(), None)?;
        }
        index.write()
    })
    .with_context(|| format!("failed to stage {rel}"))
}

// Retry wrapper with exponential backoff for transient FS-change errors.
fn with_retries<F>(max_attempts: u32, initial_backoff_ms: u64, mut op: F) -> Result<()>
where
    F: FnMut() -> std::result::Result<(), git2::Error>,
{
    let mut backoff_ms = initial_backoff_ms;
    let mut attempt = 1u32;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(e) if is_transient_fs_change(&e) && attempt < max_attempts => {
                warn!(
                    attempt,
                    backoff_ms,
                    "transient index error, retrying after backoff: {}",
                    e.message()
                );
            }
            Err(e) => return Err(e.into()),
        }

        std::thread::sleep(std::time::Duration::from_millis(backoff_ms));
        attempt += 1;
        backoff_ms = (backoff_ms * 2).min(800);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn staged_paths(repo: &Repository) -> Vec<String> {
        let index = repo.index().unwrap();
        index
            .iter()
            .map(|e| String::from_utf8(e.path).unwrap())
            .collect()
    }

    #[test]
    fn stage_all_picks_up_new_and_nested_files() {
        let td = tempfile::tempdir().unwrap();
        let repo = Repository::init(td.path()).unwrap();
        fs::write(td.path().join("a.txt"), "a").unwrap();
        fs::create_dir(td.path().join("b")).unwrap();
        fs::write(td.path().join("b").join("c.txt"), "c").unwrap();

        stage_all(&repo).unwrap();

        assert_eq!(staged_paths(&repo), vec!["a.txt", "b/c.txt"]);
    }

    #[test]
    fn stage_path_removes_deleted_file_from_index() {
        let td = tempfile::tempdir().unwrap();
        let repo = Repository::init(td.path()).unwrap();
        fs::write(td.path().join("gone.txt"), "x").unwrap();
        stage_path(&repo, "gone.txt").unwrap();
        assert_eq!(staged_paths(&repo), vec!["gone.txt"]);

        fs::remove_file(td.path().join("gone.txt")).unwrap();
        stage_path(&repo, "gone.txt").unwrap();
        assert!(staged_paths(&repo).is_empty());
    }

    #[test]
    fn transient_retry_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result = with_retries(3, 1, || {
            calls += 1;
            Err(git2::Error::new(
                ErrorCode::Modified,
                ErrorClass::Filesystem,
                "file changed before we could read it",
            ))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
