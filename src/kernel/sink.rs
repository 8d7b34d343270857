//! Completion sinks: where finished kernel operations are reported.
//!
//! Each lifecycle manager is given its own sink. Sinks are called from the
//! manager's worker task and must never block it, so channel sinks use
//! non-blocking sends and drop the notification (with a warning) when the
//! receiver is gone or full.

use crate::models::TransactionOutcome;

/// Receiver of the single success/failure signal of every kernel operation.
pub trait CompletionSink: Send + Sync {
    fn kernel_op_finished(&self, outcome: TransactionOutcome);
}

impl CompletionSink for tokio::sync::mpsc::UnboundedSender<TransactionOutcome> {
    fn kernel_op_finished(&self, outcome: TransactionOutcome) {
        if self.send(outcome).is_err() {
            log::warn!("[Lifecycle] Completion receiver closed, outcome {} dropped", outcome.id);
        }
    }
}

impl CompletionSink for tokio::sync::mpsc::Sender<TransactionOutcome> {
    fn kernel_op_finished(&self, outcome: TransactionOutcome) {
        if let Err(e) = self.try_send(outcome) {
            log::warn!("[Lifecycle] Outcome {} not delivered: {}", outcome.id, e);
        }
    }
}

impl CompletionSink for crossbeam_channel::Sender<TransactionOutcome> {
    fn kernel_op_finished(&self, outcome: TransactionOutcome) {
        if let Err(e) = self.try_send(outcome) {
            log::warn!("[Lifecycle] Outcome {} not delivered: {}", outcome.id, e);
        }
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> CompletionSink for FnSink<F>
where
    F: Fn(TransactionOutcome) + Send + Sync,
{
    fn kernel_op_finished(&self, outcome: TransactionOutcome) {
        (self.0)(outcome)
    }
}

/// Sink that only writes outcomes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CompletionSink for LogSink {
    fn kernel_op_finished(&self, outcome: TransactionOutcome) {
        if outcome.success {
            log::info!("[Lifecycle] Kernel {} {} succeeded", outcome.kind, outcome.id);
        } else {
            log::warn!("[Lifecycle] Kernel {} {} failed", outcome.kind, outcome.id);
        }
    }
}
