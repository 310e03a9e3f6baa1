use std::path::PathBuf;

use anyhow::{Context, Result};
use git2::Repository;

use super::{commit, index, push, repo};

/// Remote every cycle pushes to.
pub const REMOTE: &str = "origin";

/// Version-control operations the commit cycles need, bound to one repository.
pub trait VersionControl: Send + Sync {
    /// Whether the bound path is inside an initialized repository.
    ///
    /// # Errors
    /// Returns an error if the repository status cannot be determined.
    fn is_initialized(&self) -> Result<bool>;

    /// Stage every change in the working tree.
    ///
    /// # Errors
    /// Returns an error if the index cannot be updated.
    fn stage_all(&self) -> Result<()>;

    /// Stage one work-tree-relative path (a removal if it no longer exists).
    ///
    /// # Errors
    /// Returns an error if the index cannot be updated.
    fn stage_path(&self, path: &str) -> Result<()>;

    /// Commit the index. Returns the short hash, or None when nothing changed.
    ///
    /// # Errors
    /// Returns an error if the commit cannot be written.
    fn commit(&self, message: &str) -> Result<Option<String>>;

    /// Name of the checked-out branch.
    ///
    /// # Errors
    /// Returns an error if `HEAD` is detached or unreadable.
    fn current_branch(&self) -> Result<String>;

    /// Push `branch` to `remote`.
    ///
    /// # Errors
    /// Returns an error carrying git's stderr if the push is rejected.
    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// [`VersionControl`] backed by libgit2, with pushes delegated to `git`.
#[derive(Debug, Clone)]
pub struct GitGateway {
    root: PathBuf,
}

impl GitGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Repository is not Sync; open per operation instead of sharing one handle.
    fn open(&self) -> Result<Repository> {
        Repository::discover(&self.root)
            .with_context(|| format!("failed to open repository at {}", self.root.display()))
    }
}

impl VersionControl for GitGateway {
    fn is_initialized(&self) -> Result<bool> {
        repo::is_repository(&self.root)
    }

    fn stage_all(&self) -> Result<()> {
        index::stage_all(&self.open()?)
    }

    fn stage_path(&self, path: &str) -> Result<()> {
        index::stage_path(&self.open()?, path)
    }

    fn commit(&self, message: &str) -> Result<Option<String>> {
        commit::commit_index(&self.open()?, message)
    }

    fn current_branch(&self) -> Result<String> {
        commit::current_branch(&self.open()?)
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let repo = self.open()?;
        let workdir = repo
            .workdir()
            .context("repository has no working directory")?;
        push::push(workdir, remote, branch)
    }
}
