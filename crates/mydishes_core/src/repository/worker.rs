//! Serialized repository worker.
//!
//! One named OS thread owns the [`DishStore`] and drains a FIFO command
//! channel, so no two store operations ever run concurrently. Callers get a
//! [`PendingResult`] to block on, or a callback delivered through a
//! [`Dispatcher`].
//!
//! # Invariants
//! - Operations run in submission order, one at a time, to completion.
//! - A panic inside one operation is caught at its boundary and reported as
//!   that operation's error; the worker keeps serving the queue. A panicking
//!   inline callback is logged and dropped.
//! - Every submitted operation reports exactly once: its result, `Cancelled`,
//!   or `WorkerUnavailable`.
//! - Operations must never wait on results of other operations from inside
//!   the worker; that would deadlock the queue.

use super::dish_store::DishStore;
use super::dispatch::Dispatcher;
use super::error::{RepoError, RepoResult};
use crate::logging::panic_payload_summary;
use log::{error, info, warn};
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

const WORKER_THREAD_NAME: &str = "mydishes-repo";

// ── Commands ───────────────────────────────────────────────────────

enum WorkerCommand {
    Run(Box<dyn QueuedOp>),
    Shutdown,
}

/// Type-erased queued operation.
trait QueuedOp: Send {
    fn run(self: Box<Self>, store: &mut DishStore);
    /// Reports `err` without touching the store.
    fn abandon(self: Box<Self>, err: RepoError);
}

struct Op<T, F, D> {
    name: &'static str,
    cancelled: Arc<AtomicBool>,
    work: F,
    deliver: D,
    _result: PhantomData<fn() -> T>,
}

impl<T, F, D> QueuedOp for Op<T, F, D>
where
    F: FnOnce(&mut DishStore) -> RepoResult<T> + Send,
    D: FnOnce(RepoResult<T>) + Send,
{
    fn run(self: Box<Self>, store: &mut DishStore) {
        let Op {
            name,
            cancelled,
            work,
            deliver,
            ..
        } = *self;

        if cancelled.load(Ordering::Acquire) {
            info!("event={name} module=repository status=cancelled");
            deliver(Err(RepoError::Cancelled));
            return;
        }

        let started_at = Instant::now();
        let result = match panic::catch_unwind(AssertUnwindSafe(|| work(store))) {
            Ok(result) => result,
            Err(payload) => {
                let summary = panic_payload_summary(payload.as_ref());
                error!(
                    "event=op_panic module=repository status=error op={name} payload={summary}"
                );
                Err(RepoError::OperationPanicked(summary))
            }
        };

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!("event={name} module=repository status=ok duration_ms={duration_ms}"),
            Err(err) => warn!(
                "event={name} module=repository status=error duration_ms={duration_ms} error_code={} error={err}",
                err.kind()
            ),
        }
        deliver(result);
    }

    fn abandon(self: Box<Self>, err: RepoError) {
        warn!(
            "event={} module=repository status=error error_code={}",
            self.name,
            err.kind()
        );
        (self.deliver)(Err(err));
    }
}

// ── Caller-side handles ────────────────────────────────────────────

/// Cancels a queued operation that has not started yet.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the operation cancelled. No effect once it has started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Result of a submitted operation, available once the worker has run it.
pub struct PendingResult<T> {
    rx: mpsc::Receiver<RepoResult<T>>,
    cancel: CancelHandle,
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<T> PendingResult<T> {
    /// Blocks until the operation reports.
    pub fn wait(self) -> RepoResult<T> {
        self.rx.recv().map_err(|_| RepoError::WorkerUnavailable)?
    }

    /// Blocks up to `timeout`. On timeout the still-pending handle is
    /// returned so the caller can keep waiting or cancel.
    pub fn wait_timeout(self, timeout: Duration) -> Result<RepoResult<T>, Self> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(self),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(Err(RepoError::WorkerUnavailable)),
        }
    }

    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

// ── Worker ─────────────────────────────────────────────────────────

/// Handle to the thread that owns the store.
pub struct SerializedWorker {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SerializedWorker {
    /// Moves `store` onto a new worker thread.
    pub fn spawn(store: DishStore) -> RepoResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || Self::run(store, cmd_rx))
            .map_err(|err| {
                error!("event=repo_worker_start module=repository status=error error={err}");
                RepoError::WorkerUnavailable
            })?;

        info!("event=repo_worker_start module=repository status=ok thread={WORKER_THREAD_NAME}");
        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Queues `work` and returns a handle to block on its result.
    pub fn submit<T, F>(&self, name: &'static str, work: F) -> PendingResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DishStore) -> RepoResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancel = self.enqueue(name, work, move |result| {
            // Caller dropped the pending result; nobody is waiting.
            let _ = tx.send(result);
        });
        PendingResult { rx, cancel }
    }

    /// Queues `work` and hands its result to `callback` via `dispatcher`.
    pub fn submit_with<T, F, C>(
        &self,
        name: &'static str,
        work: F,
        dispatcher: Arc<dyn Dispatcher>,
        callback: C,
    ) -> CancelHandle
    where
        T: Send + 'static,
        F: FnOnce(&mut DishStore) -> RepoResult<T> + Send + 'static,
        C: FnOnce(RepoResult<T>) + Send + 'static,
    {
        self.enqueue(name, work, move |result| {
            dispatcher.dispatch(Box::new(move || callback(result)));
        })
    }

    /// Whether the worker thread is still accepting work.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Lets already-queued work finish, then stops and joins the worker.
    ///
    /// Called from the worker thread itself (an inline callback dropping the
    /// last handle), the worker is told to stop but not joined.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
        if thread.thread().id() == thread::current().id() {
            info!("event=repo_worker_stop module=repository status=detached");
            return;
        }
        if thread.join().is_err() {
            error!("event=repo_worker_stop module=repository status=error error=join_failed");
        }
    }

    fn enqueue<T, F, D>(&self, name: &'static str, work: F, deliver: D) -> CancelHandle
    where
        T: Send + 'static,
        F: FnOnce(&mut DishStore) -> RepoResult<T> + Send + 'static,
        D: FnOnce(RepoResult<T>) + Send + 'static,
    {
        let cancel = CancelHandle::new();
        let op: Box<dyn QueuedOp> = Box::new(Op {
            name,
            cancelled: Arc::clone(&cancel.cancelled),
            work,
            deliver,
            _result: PhantomData,
        });

        if let Err(mpsc::SendError(WorkerCommand::Run(op))) =
            self.cmd_tx.send(WorkerCommand::Run(op))
        {
            op.abandon(RepoError::WorkerUnavailable);
        }
        cancel
    }

    fn run(mut store: DishStore, cmd_rx: mpsc::Receiver<WorkerCommand>) {
        let mut processed: u64 = 0;
        while let Ok(command) = cmd_rx.recv() {
            match command {
                WorkerCommand::Run(op) => {
                    // Work panics are caught inside `run`; this catches the delivery.
                    if panic::catch_unwind(AssertUnwindSafe(|| op.run(&mut store))).is_err() {
                        error!("event=callback_panic module=repository status=error");
                    }
                    processed += 1;
                }
                WorkerCommand::Shutdown => break,
            }
        }

        let mut abandoned: u64 = 0;
        while let Ok(command) = cmd_rx.try_recv() {
            if let WorkerCommand::Run(op) = command {
                op.abandon(RepoError::WorkerUnavailable);
                abandoned += 1;
            }
        }
        info!(
            "event=repo_worker_stop module=repository status=ok processed={processed} abandoned={abandoned}"
        );
    }
}

impl Drop for SerializedWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
