//! Keyboard shortcuts: manual commit and cancel.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::JoinHandle,
    time::Duration,
};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, error};

use super::session::{SessionSender, ShutdownReason};

/// A key plus the modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Shift is ignored and letters compare case-insensitively, so Ctrl+S and
    /// Ctrl+Shift+S are the same chord.
    #[must_use]
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let pressed = key.modifiers.difference(KeyModifiers::SHIFT);
        let wanted = self.modifiers.difference(KeyModifiers::SHIFT);
        if pressed != wanted {
            return false;
        }
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    MacOs,
    Other,
}

impl PlatformFamily {
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

/// Shortcuts in effect for one platform family.
#[derive(Debug)]
pub struct Hotkeys {
    pub manual_commit: &'static [KeyChord],
    pub cancel: &'static [KeyChord],
    /// How the manual-commit shortcut is shown to the operator.
    pub manual_label: &'static str,
}

const CANCEL: &[KeyChord] = &[KeyChord::new(KeyCode::Char('c'), KeyModifiers::CONTROL)];

// Option+S arrives as Alt+S when the terminal treats Option as Meta, and as
// 'ß' on default macOS layouts.
static HOTKEYS: &[(PlatformFamily, Hotkeys)] = &[
    (
        PlatformFamily::MacOs,
        Hotkeys {
            manual_commit: &[
                KeyChord::new(KeyCode::Char('s'), KeyModifiers::ALT),
                KeyChord::new(KeyCode::Char('ß'), KeyModifiers::NONE),
            ],
            cancel: CANCEL,
            manual_label: "Option+S",
        },
    ),
    (
        PlatformFamily::Other,
        Hotkeys {
            manual_commit: &[KeyChord::new(KeyCode::Char('s'), KeyModifiers::CONTROL)],
            cancel: CANCEL,
            manual_label: "Ctrl+S",
        },
    ),
];

impl Hotkeys {
    #[must_use]
    pub fn for_platform(family: PlatformFamily) -> &'static Self {
        HOTKEYS
            .iter()
            .find(|(f, _)| *f == family)
            .map_or(&HOTKEYS[HOTKEYS.len() - 1].1, |(_, keys)| keys)
    }

    #[must_use]
    pub fn is_manual_commit(&self, key: &KeyEvent) -> bool {
        self.manual_commit.iter().any(|c| c.matches(key))
    }

    #[must_use]
    pub fn is_cancel(&self, key: &KeyEvent) -> bool {
        self.cancel.iter().any(|c| c.matches(key))
    }
}

/// Held by the session while a manual cycle owns the terminal.
/// The key listener stays parked until this is dropped.
#[derive(Debug)]
pub struct InputPause {
    _resume: mpsc::Sender<()>,
}

impl InputPause {
    /// Create a pause token and the receiver that unblocks once it is dropped.
    #[must_use]
    pub fn pair() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { _resume: tx }, rx)
    }
}

/// Background thread translating key presses into session messages.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    /// Start polling terminal key events. The terminal must already be in raw mode.
    pub fn spawn(hotkeys: &'static Hotkeys, sender: SessionSender) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || listen(hotkeys, &sender, &thread_stop));
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // A listener parked behind an abandoned prompt never finishes; only
        // join threads that are already done.
        if let Some(handle) = self.handle.take()
            && handle.is_finished()
        {
            let _ = handle.join();
        }
    }
}

fn listen(hotkeys: &Hotkeys, sender: &SessionSender, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        let key = match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "failed to read terminal input");
                    return;
                }
            },
            Ok(false) => continue,
            Err(e) => {
                error!(error = %e, "failed to poll terminal input");
                return;
            }
        };

        if hotkeys.is_cancel(&key) {
            sender.shutdown(ShutdownReason::CancelKey);
            return;
        }
        if hotkeys.is_manual_commit(&key) {
            let (pause, resumed) = InputPause::pair();
            if !sender.manual_commit(pause) {
                return;
            }
            // Returns once the session drops the pause token.
            let _ = resumed.recv();
            debug!("key listener resumed");
        }
    }
}
