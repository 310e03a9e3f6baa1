use std::{
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};

use crate::core::git::state_dir;

// Global guard to keep the file appender alive
static FILE_APPENDER_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);

/// Flush and close the log file appender.
pub fn flush_logs() {
    // Taking the guard will drop it, which flushes pending logs
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock() {
        drop(guard_holder.take());
    }
}

/// Writer that ends lines with CRLF so console output stays aligned while the
/// terminal is in raw mode, where a bare LF does not return the cursor.
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = buf.split(|b| *b == b'\n').peekable();
        while let Some(line) = lines.next() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            self.inner.write_all(line)?;
            if lines.peek().is_some() {
                self.inner.write_all(b"\r\n")?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn base_filter(verbosity: u8) -> String {
    let base = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    std::env::var("RUST_LOG").unwrap_or_else(|_| base.to_string())
}

/// Initialize console tracing. `RUST_LOG` (if set) takes precedence.
/// Otherwise, -v/-vv map to "debug"/"trace".
pub fn init_tracing(verbosity: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter_layer =
        EnvFilter::try_new(base_filter(verbosity)).context("invalid RUST_LOG / filter")?;
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(|| CrlfWriter::new(io::stderr()));

    // Allow re-init to be a no-op in tests
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .try_init();

    Ok(())
}

/// Initialize console tracing plus a daily log file under `<git-dir>/autocommit`.
pub fn init_tracing_with_file(git_dir: &Path, verbosity: u8) -> Result<()> {
    use tracing_appender::rolling::{Builder, Rotation};
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter_layer =
        EnvFilter::try_new(base_filter(verbosity)).context("invalid RUST_LOG / filter")?;

    let log_dir = state_dir(git_dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let file_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix("autocommit.log")
        .build(&log_dir)
        .context("failed to open log file")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard globally to keep it alive for the program duration
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock() {
        *guard_holder = Some(guard);
    }

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(non_blocking);
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(|| CrlfWriter::new(io::stderr()));

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    Ok(())
}
