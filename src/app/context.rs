use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppContext {
    /// Directory the command operates on, canonicalized.
    pub target: PathBuf,
    pub verbosity: u8,
}

impl AppContext {
    pub const fn new(target: PathBuf, verbosity: u8) -> Self {
        Self { target, verbosity }
    }

    /// Resolve `path` (or the current directory) to an absolute, canonical target.
    ///
    /// # Errors
    /// Returns an error if the path does not exist or the current directory is unreadable.
    pub fn resolve(path: Option<&Path>, verbosity: u8) -> Result<Self> {
        let raw = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().context("failed to read current directory")?,
        };
        let target = std::fs::canonicalize(&raw)
            .with_context(|| format!("cannot access {}", raw.display()))?;
        Ok(Self::new(target, verbosity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_canonicalizes_and_keeps_verbosity() {
        let td = tempfile::tempdir().unwrap();
        let nested = td.path().join("a");
        std::fs::create_dir(&nested).unwrap();

        let ctx = AppContext::resolve(Some(&nested.join("..").join("a")), 2).unwrap();

        assert_eq!(ctx.target, std::fs::canonicalize(&nested).unwrap());
        assert_eq!(ctx.verbosity, 2);
    }

    #[test]
    fn resolve_rejects_missing_path() {
        let td = tempfile::tempdir().unwrap();
        let err = AppContext::resolve(Some(&td.path().join("missing")), 0).unwrap_err();
        assert!(err.to_string().contains("cannot access"));
    }
}
