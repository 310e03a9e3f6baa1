use std::{
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context, Result, bail};

/// Push `branch` to `remote` with the `git` executable.
///
/// Uses the user's own git transport configuration. Terminal prompting is
/// disabled since the session holds the terminal in raw mode.
pub(crate) fn push(workdir: &Path, remote: &str, branch: &str) -> Result<()> {
    let output = Command::new("git")
        .args(["push", remote, branch])
        .current_dir(workdir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()
        .context("failed to run git push")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git push {remote} {branch} failed: {}", stderr.trim());
    }
    Ok(())
}
