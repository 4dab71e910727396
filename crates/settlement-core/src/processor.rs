//! Batch processor: the single consumer of the settlement queue.
//!
//! Queued transactions accumulate in an in-memory batch that is flushed when
//! it reaches `batch_size` or when `batch_timeout` elapses since the last
//! flush, whichever comes first. A flush settles the whole batch under one
//! exclusive lock acquisition, in the order the items were drained.
//!
//! On stop the queue is closed, every item still waiting in it is drained and
//! settled, and only then does the task exit.

use crate::ledger::{Ledger, QueuedTransaction};
use crate::settlement::{settle, SettlementResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushTrigger {
    Size,
    Timeout,
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => f.write_str("size"),
            Self::Timeout => f.write_str("timeout"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

pub(crate) struct BatchProcessor {
    ledger: Arc<RwLock<Ledger>>,
    queue: mpsc::Receiver<QueuedTransaction>,
    results: broadcast::Sender<SettlementResult>,
    batch: Vec<QueuedTransaction>,
    batch_size: usize,
    batch_timeout: Duration,
}

impl BatchProcessor {
    pub(crate) fn new(
        ledger: Arc<RwLock<Ledger>>,
        queue: mpsc::Receiver<QueuedTransaction>,
        results: broadcast::Sender<SettlementResult>,
        batch_size: usize,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            queue,
            results,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            batch_timeout,
        }
    }

    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            batch_timeout = ?self.batch_timeout,
            "Batch processor started"
        );

        let deadline = sleep(self.batch_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                received = self.queue.recv() => {
                    let Some(queued) = received else {
                        warn!("Settlement queue closed, stopping batch processor");
                        break;
                    };

                    self.batch.push(queued);
                    if self.batch.len() >= self.batch_size {
                        self.flush(FlushTrigger::Size);
                        deadline.as_mut().reset(Instant::now() + self.batch_timeout);
                    }
                }

                () = &mut deadline => {
                    if !self.batch.is_empty() {
                        self.flush(FlushTrigger::Timeout);
                    }
                    deadline.as_mut().reset(Instant::now() + self.batch_timeout);
                }
            }
        }

        self.drain();

        info!("Batch processor stopped");
    }

    /// Closes the queue and settles everything still buffered or waiting in it
    fn drain(&mut self) {
        self.queue.close();

        while let Ok(queued) = self.queue.try_recv() {
            self.batch.push(queued);
            if self.batch.len() >= self.batch_size {
                self.flush(FlushTrigger::Shutdown);
            }
        }

        if !self.batch.is_empty() {
            self.flush(FlushTrigger::Shutdown);
        }
    }

    fn flush(&mut self, trigger: FlushTrigger) {
        let results: Vec<SettlementResult> = {
            let mut ledger = self.ledger.write();
            self.batch
                .drain(..)
                .map(|queued| settle(&mut ledger, &queued))
                .collect()
        };

        let succeeded = results.iter().filter(|result| result.success).count();
        let failed = results.len() - succeeded;

        for result in results {
            match &result.error {
                None => debug!(
                    tx = %result.transaction_id,
                    balance = ?result.balance,
                    "Transaction settled"
                ),
                Some(err) => debug!(
                    tx = %result.transaction_id,
                    balance = ?result.balance,
                    "Transaction failed: {err}"
                ),
            }

            // No subscribers is fine, results stay in the ledger
            let _ = self.results.send(result);
        }

        info!(%trigger, succeeded, failed, "Batch flushed");
    }
}
