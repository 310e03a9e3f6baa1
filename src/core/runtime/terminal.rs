use std::io::{self, IsTerminal};
#[cfg(unix)]
use std::os::fd::AsFd;

use anyhow::{Context, Result};
use console::{Term, style};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
#[cfg(unix)]
use nix::sys::termios::{self, SetArg, Termios};
use tracing::warn;

use super::cycle::CommitPrompt;

/// Terminal attributes captured from a descriptor, written back on demand.
///
/// crossterm keeps a single saved mode that any `disable_raw_mode` call
/// consumes, so the session keeps its own copy of the attributes it started with.
#[cfg(unix)]
pub struct SavedTermios<F: AsFd> {
    fd: F,
    original: Termios,
}

#[cfg(unix)]
impl<F: AsFd> SavedTermios<F> {
    /// # Errors
    /// Returns an error if `fd` is not a terminal.
    pub fn capture(fd: F) -> Result<Self> {
        let original = termios::tcgetattr(&fd).context("failed to read terminal attributes")?;
        Ok(Self { fd, original })
    }

    /// # Errors
    /// Returns an error if the attributes cannot be applied.
    pub fn restore(&self) -> Result<()> {
        termios::tcsetattr(&self.fd, SetArg::TCSANOW, &self.original)
            .context("failed to restore terminal attributes")
    }
}

/// Keeps the terminal in raw mode for the lifetime of a session.
/// Inactive when stdin is not a terminal.
///
/// Dropping the guard restores the attributes stdin had at acquisition, even if
/// an abandoned prompt left echo disabled.
pub struct RawModeGuard {
    active: bool,
    #[cfg(unix)]
    saved: Option<SavedTermios<io::Stdin>>,
}

impl RawModeGuard {
    /// # Errors
    /// Returns an error if stdin is a terminal but raw mode cannot be enabled.
    pub fn acquire() -> Result<Self> {
        if !io::stdin().is_terminal() {
            return Ok(Self::inactive());
        }
        #[cfg(unix)]
        let saved = Some(SavedTermios::capture(io::stdin())?);
        enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self {
            active: true,
            #[cfg(unix)]
            saved,
        })
    }

    const fn inactive() -> Self {
        Self {
            active: false,
            #[cfg(unix)]
            saved: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "failed to leave raw terminal mode");
        }
        self.restore_saved();
    }
}

impl RawModeGuard {
    #[cfg(unix)]
    fn restore_saved(&self) {
        if let Some(saved) = &self.saved
            && let Err(e) = saved.restore()
        {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }

    #[cfg(not(unix))]
    const fn restore_saved(&self) {}
}

/// Leaves raw mode (if it was on) until dropped, then re-enters it.
struct CookedModeGuard {
    was_raw: bool,
}

impl CookedModeGuard {
    fn enter() -> Result<Self> {
        let was_raw = is_raw_mode_enabled().unwrap_or(false);
        if was_raw {
            disable_raw_mode().context("failed to leave raw terminal mode")?;
        }
        Ok(Self { was_raw })
    }
}

impl Drop for CookedModeGuard {
    fn drop(&mut self) {
        if self.was_raw
            && let Err(e) = enable_raw_mode()
        {
            warn!(error = %e, "failed to re-enable raw terminal mode");
        }
    }
}

/// Reads the manual commit message from the controlling terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl CommitPrompt for TerminalPrompt {
    fn read_message(&self) -> Result<String> {
        let _cooked = CookedModeGuard::enter()?;
        let term = Term::stderr();
        term.write_line("")?;
        term.write_str(&format!(
            "{} ",
            style("Commit message (empty to cancel):").cyan().bold()
        ))?;
        term.read_secure_line()
            .context("failed to read commit message")
    }
}
