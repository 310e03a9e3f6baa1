use anyhow::{Context, Result, bail};
use git2::{Commit, Repository, Signature, Tree};

/// Commit the current index onto `HEAD`.
/// Returns the short hash of the new commit, or None if the index matches `HEAD`.
pub(crate) fn commit_index(repo: &Repository, message: &str) -> Result<Option<String>> {
    let mut index = repo.index().context("failed to open index")?;
    let tree_id = index.write_tree().context("failed to write tree from index")?;
    let tree = repo
        .find_tree(tree_id)
        .context("failed to find written tree")?;

    if let Some(prev_tree) = head_tree(repo)?
        && prev_tree.id() == tree.id()
    {
        return Ok(None);
    }

    let sig = signature(repo)?;

    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => match head.target() {
            Some(oid) => vec![
                repo.find_commit(oid)
                    .context("failed to peel HEAD to commit")?,
            ],
            None => Vec::new(),
        },
        // Unborn branch: this is the first commit.
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&Commit> = parents.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .context("failed to create commit")?;

    if let Ok(short) = repo.find_object(oid, None).and_then(|o| o.short_id())
        && let Some(s) = short.as_str()
    {
        Ok(Some(s.to_string()))
    } else {
        Ok(Some(oid.to_string()))
    }
}

/// Name of the checked-out branch.
pub(crate) fn current_branch(repo: &Repository) -> Result<String> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
            // Nothing committed yet; HEAD still names the branch.
            let head_ref = repo.find_reference("HEAD").context("failed to read HEAD")?;
            if let Some(target) = head_ref.symbolic_target()
                && let Some(name) = target.strip_prefix("refs/heads/")
            {
                return Ok(name.to_string());
            }
            bail!("HEAD does not point at a branch");
        }
        Err(e) => return Err(anyhow::Error::from(e).context("failed to resolve HEAD")),
    };

    if !head.is_branch() {
        bail!("HEAD is detached; check out a branch to push");
    }
    head.shorthand()
        .map(str::to_string)
        .context("branch name is not valid UTF-8")
}

fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
    match repo.head() {
        Ok(head) => {
            if let Some(oid) = head.target() {
                let commit = repo.find_commit(oid)?;
                Ok(Some(commit.tree()?))
            } else {
                Ok(None)
            }
        }
        Err(_) => Ok(None),
    }
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    let cfg = repo.config().context("failed to open git config")?;
    let name = cfg
        .get_string("user.name")
        .unwrap_or_else(|_| "git-autocommit".to_string());
    let email = cfg
        .get_string("user.email")
        .unwrap_or_else(|_| "git-autocommit@local".to_string());
    Signature::now(&name, &email).context("failed to create signature")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::git::index::stage_all;

    #[test]
    fn commits_then_reports_nothing_to_commit() {
        let td = tempfile::tempdir().unwrap();
        let repo = Repository::init(td.path()).unwrap();
        fs::write(td.path().join("a.txt"), "one").unwrap();
        stage_all(&repo).unwrap();

        let first = commit_index(&repo, "first").unwrap();
        assert!(first.is_some());
        assert_eq!(
            repo.head().unwrap().peel_to_commit().unwrap().message(),
            Some("first")
        );

        // Same tree again: no empty commit is created.
        assert_eq!(commit_index(&repo, "second").unwrap(), None);
    }

    #[test]
    fn branch_is_known_before_first_commit() {
        let td = tempfile::tempdir().unwrap();
        let repo = Repository::init(td.path()).unwrap();
        repo.set_head("refs/heads/trunk").unwrap();
        assert_eq!(current_branch(&repo).unwrap(), "trunk");
    }

    #[test]
    fn detached_head_is_an_error() {
        let td = tempfile::tempdir().unwrap();
        let repo = Repository::init(td.path()).unwrap();
        fs::write(td.path().join("a.txt"), "one").unwrap();
        stage_all(&repo).unwrap();
        commit_index(&repo, "first").unwrap();

        let oid = repo.head().unwrap().target().unwrap();
        repo.set_head_detached(oid).unwrap();

        let err = current_branch(&repo).unwrap_err();
        assert!(err.to_string().contains("detached"));
    }
}
