//! Delivery of operation results onto a caller-chosen context.
//!
//! A UI-style caller owns a [`DispatchQueue`] and drains it on its own thread;
//! results of callback-flavoured repository operations are queued there
//! instead of running on the repository worker.

use std::sync::mpsc;
use std::time::Duration;

/// A unit of work handed to a [`Dispatcher`].
pub type DispatchTask = Box<dyn FnOnce() + Send + 'static>;

/// Executes result callbacks on some context.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: DispatchTask);
}

/// Runs callbacks immediately on the repository worker thread.
///
/// Callbacks must be short and must not wait on repository results.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: DispatchTask) {
        task();
    }
}

/// Sends callbacks to the paired [`DispatchQueue`].
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    tx: mpsc::Sender<DispatchTask>,
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: DispatchTask) {
        // A dropped queue means the caller context is gone; nothing to run on.
        let _ = self.tx.send(task);
    }
}

/// Caller-side end of a [`QueueDispatcher`].
pub struct DispatchQueue {
    rx: mpsc::Receiver<DispatchTask>,
}

impl DispatchQueue {
    /// Runs every callback already queued and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one callback and runs it.
    ///
    /// Returns `false` on timeout or when every dispatcher is gone.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}

/// Creates a connected dispatcher/queue pair.
pub fn dispatch_queue() -> (QueueDispatcher, DispatchQueue) {
    let (tx, rx) = mpsc::channel();
    (QueueDispatcher { tx }, DispatchQueue { rx })
}
