use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;

/// Autocommit configuration values sourced from git config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocommitConfig {
    /// Interval between automatic commit cycles, in milliseconds.
    pub interval_ms: u64,
    /// Throttle window in milliseconds for coalescing watcher events.
    pub debounce_ms: u64,
}

impl Default for AutocommitConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            debounce_ms: 100,
        }
    }
}

impl AutocommitConfig {
    /// Load configuration from git config with precedence: local → global → system.
    /// Missing or out-of-range values keep their defaults.
    ///
    /// # Errors
    /// Returns an error if repository discovery or reading config fails.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let repo = Repository::discover(repo_root).with_context(|| {
            format!(
                "failed to discover Git repository from {}",
                repo_root.display()
            )
        })?;

        let cfg = repo.config().context("failed to open git config")?;

        let mut out = Self::default();

        if let Ok(v) = cfg.get_i64("autocommit.interval-ms")
            && v > 0
            && let Ok(vu) = u64::try_from(v)
        {
            out.interval_ms = vu;
        }
        if let Ok(v) = cfg.get_i64("autocommit.debounce-ms")
            && let Ok(vu) = u64::try_from(v)
        {
            out.debounce_ms = vu;
        }

        Ok(out)
    }
}
