//! Kernel Lifecycle Manager: install and remove kernels with their headers
//!
//! This module handles:
//! - Pairing a kernel package with its `-headers` package
//! - Queueing install/remove transactions for the engine, one at a time
//! - Reporting every finished transaction exactly once, to the manager's
//!   completion sink and to the pending handle returned to the caller
//!
//! Pairing is purely syntactic. Whether both packages exist is decided by the
//! engine when the transaction runs; a missing package is just a failed
//! outcome.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::LifecycleError;
use crate::kernel::sink::CompletionSink;
use crate::models::{
    KernelPackageName, RequestId, TransactionKind, TransactionOutcome, TransactionRequest,
};
use crate::transaction::TransactionEngine;

/// A queued transaction and the channel its outcome goes back on.
struct Job {
    request: TransactionRequest,
    reply: oneshot::Sender<TransactionOutcome>,
}

/// Handle for one submitted kernel operation.
///
/// Dropping it does not cancel the operation; the outcome still reaches the
/// manager's sink.
#[derive(Debug)]
pub struct PendingOutcome {
    id: RequestId,
    kind: TransactionKind,
    rx: oneshot::Receiver<TransactionOutcome>,
}

impl PendingOutcome {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Wait for the operation to finish.
    ///
    /// If the worker went away without answering (runtime shutdown) the
    /// operation is reported as failed.
    pub async fn wait(self) -> TransactionOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("[Lifecycle] Worker dropped request {} without an outcome", self.id);
                TransactionOutcome {
                    id: self.id,
                    kind: self.kind,
                    success: false,
                }
            }
        }
    }
}

/// Orchestrates kernel install/remove transactions.
///
/// Submissions never run concurrently: each manager owns one worker task
/// that feeds requests to the engine in FIFO order and waits for each to
/// finish before starting the next. Overlapping calls are queued, not
/// rejected.
pub struct KernelLifecycleManager {
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl KernelLifecycleManager {
    /// Create a manager and start its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(engine: Arc<dyn TransactionEngine>, sink: Arc<dyn CompletionSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn(run_worker(rx, engine, sink, Arc::clone(&in_flight)));
        log::debug!("[Lifecycle] Worker started");

        KernelLifecycleManager {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            next_id: AtomicU64::new(1),
            in_flight,
        }
    }

    /// Install `name` together with `name-headers`.
    pub fn install_kernel(
        &self,
        name: impl Into<KernelPackageName>,
    ) -> Result<PendingOutcome, LifecycleError> {
        self.submit(TransactionKind::Install, name.into())
    }

    /// Remove `name` together with `name-headers`.
    pub fn remove_kernel(
        &self,
        name: impl Into<KernelPackageName>,
    ) -> Result<PendingOutcome, LifecycleError> {
        self.submit(TransactionKind::Remove, name.into())
    }

    /// Requests queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Stop accepting requests, let queued ones finish, and wait for the
    /// worker to exit.
    pub async fn shutdown(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }

        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                log::error!("[Lifecycle] Worker terminated abnormally: {}", e);
            }
        }
        log::debug!("[Lifecycle] Worker stopped");
    }

    fn submit(
        &self,
        kind: TransactionKind,
        name: KernelPackageName,
    ) -> Result<PendingOutcome, LifecycleError> {
        if name.is_empty() {
            return Err(LifecycleError::EmptyName);
        }

        let queue = self.queue.lock().map_err(|_| LifecycleError::Closed)?;
        let sender = queue.as_ref().ok_or(LifecycleError::Closed)?;

        let id = RequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = TransactionRequest::for_pair(id, kind, name.pair());
        let (reply, rx) = oneshot::channel();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if sender.send(Job { request, reply }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            log::error!("[Lifecycle] Worker is gone, request {} not queued", id);
            return Err(LifecycleError::Closed);
        }

        log::info!("[Lifecycle] Queued {} of {} as request {}", kind, name, id);
        Ok(PendingOutcome { id, kind, rx })
    }
}

impl Drop for KernelLifecycleManager {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain what is left and exit.
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    engine: Arc<dyn TransactionEngine>,
    sink: Arc<dyn CompletionSink>,
    in_flight: Arc<AtomicUsize>,
) {
    while let Some(Job { request, reply }) = rx.recv().await {
        let id = request.id();
        let kind = request.kind();
        log::info!(
            "[Lifecycle] Submitting request {}: {} [{}]",
            id,
            kind,
            request.targets().join(", ")
        );

        let success = execute_once(engine.as_ref(), request).await;
        let outcome = TransactionOutcome { id, kind, success };

        in_flight.fetch_sub(1, Ordering::SeqCst);
        on_transaction_complete(sink.as_ref(), outcome);
        // The caller may have dropped its handle; the sink already has it.
        let _ = reply.send(outcome);
    }
}

/// Run one request on the engine and collapse every failure to `false`,
/// including a panicking engine.
async fn execute_once(engine: &dyn TransactionEngine, request: TransactionRequest) -> bool {
    let id = request.id();
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| engine.execute(request))) {
        Ok(future) => future,
        Err(_) => {
            log::error!("[Lifecycle] Engine panicked while starting request {}", id);
            return false;
        }
    };

    match tokio::spawn(future).await {
        Ok(success) => success,
        Err(e) => {
            log::error!("[Lifecycle] Engine task for request {} failed: {}", id, e);
            false
        }
    }
}

/// Deliver a finished transaction to the sink.
///
/// A panicking sink is logged and otherwise ignored: the worker keeps
/// running and the caller's handle still gets the outcome.
fn on_transaction_complete(sink: &dyn CompletionSink, outcome: TransactionOutcome) {
    log::info!(
        "[Lifecycle] Request {} ({}) finished: {}",
        outcome.id,
        outcome.kind,
        if outcome.success { "success" } else { "failure" }
    );
    if std::panic::catch_unwind(AssertUnwindSafe(|| sink.kernel_op_finished(outcome))).is_err() {
        log::error!("[Lifecycle] Completion sink panicked on request {}", outcome.id);
    }
}
