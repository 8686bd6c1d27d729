use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastPosition {
    #[default]
    TopCenter,
}

/// A transient notification for the person using the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub position: ToastPosition,
    pub duration: Duration,
}

impl Toast {
    pub fn success(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
            position: ToastPosition::TopCenter,
            duration,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

#[derive(Debug, Clone)]
pub struct TerminalNotifier {
    color: bool,
}

impl TerminalNotifier {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stderr().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        let line = match toast.kind {
            ToastKind::Success => {
                info!(message = %toast.message, duration_ms = toast.duration.as_millis() as u64, "toast");
                self.paint(&format!("✔ {}", toast.message), "32")
            }
        };

        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{line}");
    }
}

/// Keeps every toast in memory, newest last.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.toasts
            .lock()
            .iter()
            .map(|toast| toast.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, toast: Toast) {
        (**self).notify(toast);
    }
}
