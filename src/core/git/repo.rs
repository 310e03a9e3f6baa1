use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use git2::{ErrorCode, Repository};

/// Locations of a discovered non-bare repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    /// Root of the working tree.
    pub workdir: PathBuf,
    /// The `.git` directory (or the gitdir a worktree's `.git` file points to).
    pub git_dir: PathBuf,
}

/// Discover the repository containing `path`.
///
/// # Errors
/// Returns an error if `path` is not inside a repository or the repository is bare.
pub fn discover(path: &Path) -> Result<RepoLayout> {
    let repo = Repository::discover(path)
        .with_context(|| format!("not inside a Git repository: {}", path.display()))?;
    let workdir = repo
        .workdir()
        .context("repository has no working directory")?;
    Ok(RepoLayout {
        workdir: normalize(workdir),
        git_dir: normalize(repo.path()),
    })
}

/// Report whether `path` lies inside an initialized repository.
///
/// `Ok(false)` means no repository was found; any other libgit2 failure means the
/// status could not be determined and is returned as an error.
pub fn is_repository(path: &Path) -> Result<bool> {
    match Repository::discover(path) {
        Ok(_) => Ok(true),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
        Err(e) => Err(anyhow::Error::from(e)
            .context(format!("failed to check repository at {}", path.display()))),
    }
}

/// Directory under the git dir holding autocommit's log and lock files.
#[must_use]
pub fn state_dir(git_dir: &Path) -> PathBuf {
    git_dir.join("autocommit")
}

/// Express `path` relative to `workdir` using forward slashes.
/// Returns None for paths outside the working tree or the root itself.
#[must_use]
pub fn relative_to_workdir(workdir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(workdir).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

// libgit2 reports directories with a trailing separator; canonicalize so
// prefix checks against watcher paths line up.
fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
