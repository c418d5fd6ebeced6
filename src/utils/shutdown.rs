//! Process-wide shutdown signal: installed once, observed by whichever sink is active.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the single shutdown request of this process.
///
/// The OS handler (SIGINT/SIGTERM via `ctrlc`) is registered once in [`ShutdownSignal::install`];
/// every unit of work receives a clone. Sinks wait on [`ShutdownSignal::receiver`] next to their
/// input queue so only the sink that is running when the request arrives finalizes its archive.
#[derive(Clone)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// A signal not wired to the OS. Trigger it manually (lib callers, tests).
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(1);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    /// Create the signal and register the process Ctrl+C / termination handler. Call once per process.
    pub fn install() -> Result<Self> {
        let signal = Self::new();
        let handler = signal.clone();
        ctrlc::set_handler(move || handler.trigger()).context("set Ctrl+C handler")?;
        Ok(signal)
    }

    /// Request shutdown. Repeated calls are no-ops.
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            let _ = self.tx.try_send(());
        }
    }

    /// True once shutdown was requested, including while the notification is still queued.
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst) || !self.rx.is_empty()
    }

    /// Becomes ready once after [`Self::trigger`]; for use in `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
