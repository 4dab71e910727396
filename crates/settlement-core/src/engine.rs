use crate::account::Account;
use crate::config::EngineConfig;
use crate::error::{AccountError, ConfigError, LifecycleError, SubmitError};
use crate::ledger::{Ledger, QueuedTransaction};
use crate::processor::BatchProcessor;
use crate::settlement::SettlementResult;
use crate::stats::Stats;
use crate::transaction::{IdGenerator, Transaction, TransactionId, TransactionRequest};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RESULT_CHANNEL_CAPACITY: usize = 1024;

enum ProcessorState {
    Idle(mpsc::Receiver<QueuedTransaction>),
    Running {
        handle: JoinHandle<()>,
        cancel: CancellationToken,
    },
    Stopped,
}

/// In-memory settlement engine.
///
/// All ledger reads share one `RwLock`; every mutation (account creation,
/// settlement, freeze, unfreeze, log append) takes it exclusively. Queued
/// transactions are settled by a single batch processor task started with
/// [`SettlementEngine::start`].
pub struct SettlementEngine {
    config: EngineConfig,
    ledger: Arc<RwLock<Ledger>>,
    queue: mpsc::Sender<QueuedTransaction>,
    results: broadcast::Sender<SettlementResult>,
    ids: IdGenerator,
    processor: Mutex<ProcessorState>,
}

impl SettlementEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (queue, receiver) = mpsc::channel(config.queue_capacity);
        let (results, _) = broadcast::channel(RESULT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            ledger: Arc::new(RwLock::new(Ledger::new())),
            queue,
            results,
            ids: IdGenerator::default(),
            processor: Mutex::new(ProcessorState::Idle(receiver)),
        })
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawns the batch processor on the current tokio runtime
    pub fn start(&self) -> Result<(), LifecycleError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;

        let mut state = self.processor.lock();
        let receiver = match std::mem::replace(&mut *state, ProcessorState::Stopped) {
            ProcessorState::Idle(receiver) => receiver,
            other => {
                *state = other;
                return Err(LifecycleError::AlreadyStarted);
            }
        };

        let processor = BatchProcessor::new(
            Arc::clone(&self.ledger),
            receiver,
            self.results.clone(),
            self.config.batch_size,
            self.config.batch_timeout,
        );
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(processor.run(cancel.clone()));

        *state = ProcessorState::Running { handle, cancel };
        info!("Settlement engine started");

        Ok(())
    }

    /// Signals the batch processor to stop and waits until it has drained the
    /// queue and flushed its last batch
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let (handle, cancel) = {
            let mut state = self.processor.lock();
            match std::mem::replace(&mut *state, ProcessorState::Stopped) {
                ProcessorState::Running { handle, cancel } => (handle, cancel),
                other => {
                    *state = other;
                    return Err(LifecycleError::NotRunning);
                }
            }
        };

        cancel.cancel();
        handle.await?;
        info!("Settlement engine stopped");

        Ok(())
    }

    pub fn create_account(
        &self,
        user_id: &str,
        initial_balance: f64,
    ) -> Result<(), AccountError> {
        self.ledger.write().create_account(user_id, initial_balance)?;
        info!(user = user_id, initial_balance, "Account created");

        Ok(())
    }

    /// Returns a snapshot of the account; later mutations are not reflected
    pub fn account(&self, user_id: &str) -> Result<Account, AccountError> {
        self.ledger.read().account(user_id).cloned()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.ledger.read().accounts().cloned().collect()
    }

    /// Validates, stamps and logs a transaction, then queues it for settlement.
    ///
    /// The transaction is logged even when queuing fails. Account existence is
    /// checked at settlement time, not here.
    pub fn submit(&self, request: TransactionRequest) -> Result<TransactionId, SubmitError> {
        if request.user_id.is_empty() {
            return Err(SubmitError::InvalidTransaction("user id must not be empty"));
        }

        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(SubmitError::InvalidTransaction(
                "amount must be a positive number",
            ));
        }

        let now = Utc::now();
        let transaction = Transaction::stamp(request, self.ids.next_id(now), now);
        let id = transaction.id;

        let position = self.ledger.write().append(transaction.clone());

        match self.queue.try_send(QueuedTransaction {
            position,
            transaction,
        }) {
            Ok(()) => {
                debug!(tx = %id, "Transaction submitted");
                Ok(id)
            }
            Err(TrySendError::Full(_)) => {
                warn!(tx = %id, "Settlement queue full, transaction not queued");
                Err(SubmitError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                warn!(tx = %id, "Settlement engine stopped, transaction not queued");
                Err(SubmitError::EngineStopped)
            }
        }
    }

    /// Moves `amount` from the available balance into the frozen reserve
    pub fn freeze(&self, user_id: &str, amount: f64) -> Result<(), AccountError> {
        self.ledger.write().freeze(user_id, amount)?;
        info!(user = user_id, amount, "Funds frozen");

        Ok(())
    }

    /// Moves `amount` from the frozen reserve back into the available balance
    pub fn unfreeze(&self, user_id: &str, amount: f64) -> Result<(), AccountError> {
        self.ledger.write().unfreeze(user_id, amount)?;
        info!(user = user_id, amount, "Funds unfrozen");

        Ok(())
    }

    pub fn stats(&self) -> Stats {
        Stats::collect(&self.ledger.read())
    }

    /// Snapshot of the transaction log in submission order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ledger.read().transactions().to_vec()
    }

    pub fn settlement_result(&self, id: TransactionId) -> Option<SettlementResult> {
        self.ledger.read().result(id).cloned()
    }

    /// Receives every settlement result produced after subscribing
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementResult> {
        self.results.subscribe()
    }
}
