//! Progress reporting and cooperative cancellation.
//!
//! The engine never blocks on its host: sinks that cannot keep up
//! drop messages instead of stalling a year. Cancellation is checked
//! once per year boundary, so the registry is always left in a
//! consistent state.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{SyncSender, TrySendError},
    Arc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMessage {
    /// Informational notice, at most one per simulated year.
    Log(String),
    /// Recoverable degradation (missing name list, dropped output).
    Warning(String),
    /// Fatal fault; the run is over.
    Error(String),
    Completed,
    Failed,
}

/// Where the engine sends progress notices.
pub trait ProgressSink {
    fn emit(&mut self, message: ProgressMessage);
}

/// Discards everything. The default for tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _message: ProgressMessage) {}
}

/// Collects messages in memory for inspection.
#[derive(Default)]
pub struct VecSink {
    pub messages: Vec<ProgressMessage>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for VecSink {
    fn emit(&mut self, message: ProgressMessage) {
        self.messages.push(message);
    }
}

/// Forwards messages over a bounded channel without blocking. A full
/// or disconnected channel drops the message.
pub struct ChannelSink {
    sender: SyncSender<ProgressMessage>,
}

impl ChannelSink {
    pub fn new(sender: SyncSender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&mut self, message: ProgressMessage) {
        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                log::warn!("Progress channel full, dropping {dropped:?}");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Shared cancellation flag. Clone freely; all clones observe the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
