//! On-chain cashout of received cheques.
//!
//! Cashing out submits the latest cheque received from a chequebook to the
//! `cashChequeBeneficiary` contract call, which transfers the owed amount
//! to a recipient address. The submission is recorded durably, a background
//! monitor waits for the transaction receipt, and the recorded action is
//! updated once with the terminal outcome: confirmed (with a parsed
//! [`CashChequeResult`]), reverted, or - while neither has been observed -
//! in flight.
//!
//! # Durability and restart
//!
//! One action is kept per chequebook under `cashout_<hex-address>`; a new
//! submission overwrites the previous action. [`CashoutService::start`]
//! rescans the namespace and re-spawns a monitor for every action still in
//! flight, so monitoring survives process restarts. The transaction hash is
//! the idempotency key: a receipt whose hash does not match the recorded
//! action is ignored.
//!
//! # Concurrency
//!
//! The whole write path (cheque fetch, submission, record, terminal write)
//! is serialized by one service mutex, so two concurrent cashouts cannot
//! race a chequebook and a terminal write cannot interleave with a fresh
//! submission. Monitors are bound to the service lifetime, not to the
//! caller that submitted: dropping the `cash_cheque` future cancels only
//! submission, while [`CashoutService::close`] stops and joins all
//! monitors.

use std::sync::{Arc, OnceLock};

use alloy_primitives::{hex, Address, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use vertex_statestore::{StateStore, StateStoreError};
use vertex_transaction::{
    ReceiptStatus, ReceiptWatch, TransactionError, TransactionService, TxReceipt, TxRequest,
};

use crate::cheque::ChequeExt;
use crate::contract;
use crate::metrics::CashoutMetrics;
use crate::store::{ChequeStore, ChequeStoreError};
use crate::SignedCheque;

/// Errors that can occur during cashout operations.
#[derive(Debug, Error)]
pub enum CashoutError {
    /// No cashout action has been recorded for the chequebook.
    #[error("no prior cashout")]
    NoCashout,

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StateStoreError),

    /// The cheque store failed or holds no cheque for the chequebook.
    #[error(transparent)]
    ChequeStore(#[from] ChequeStoreError),

    /// Transaction submission or receipt watching failed.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The bounce notification callback failed.
    #[error("notify bounced: {0}")]
    NotifyBounced(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Callback invoked when a cashed cheque bounced.
pub type NotifyBouncedFn = Box<
    dyn Fn(Address) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
>;

/// Summary of a confirmed cashout, parsed from the transaction receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashChequeResult {
    /// Beneficiary of the cashed cheque.
    pub beneficiary: Address,
    /// Address which received the funds.
    pub recipient: Address,
    /// Address that submitted the cashout transaction.
    pub caller: Address,
    /// Total amount paid out in this call.
    pub total_payout: U256,
    /// Cumulative payout of the cheque that was cashed.
    pub cumulative_payout: U256,
    /// Reward paid to the transaction submitter.
    pub caller_payout: U256,
    /// Whether part of the cheque bounced for lack of funds.
    pub bounced: bool,
}

/// The durable record of the most recent cashout for a chequebook.
///
/// `cheque` never changes after the record is first written; `result` and
/// `reverted` transition from empty/false to their final values exactly
/// once. `result == None && !reverted` means the transaction is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CashoutAction {
    tx_hash: B256,
    cheque: SignedCheque,
    result: Option<CashChequeResult>,
    reverted: bool,
}

/// Status of the latest cashout for a chequebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashoutStatus {
    /// Hash of the cashout transaction.
    pub tx_hash: B256,
    /// The cheque that was cashed, which may differ from the latest cheque.
    pub cheque: SignedCheque,
    /// The parsed outcome, if the transaction confirmed.
    pub result: Option<CashChequeResult>,
    /// Whether the transaction reverted on-chain.
    pub reverted: bool,
}

impl CashoutStatus {
    /// Whether the cashout transaction is still awaiting its receipt.
    pub fn is_in_flight(&self) -> bool {
        self.result.is_none() && !self.reverted
    }
}

impl From<CashoutAction> for CashoutStatus {
    fn from(action: CashoutAction) -> Self {
        Self {
            tx_hash: action.tx_hash,
            cheque: action.cheque,
            result: action.result,
            reverted: action.reverted,
        }
    }
}

/// Computes the store key for the last cashout action for the chequebook.
fn cashout_action_key(chequebook: Address) -> String {
    format!("cashout_{}", hex::encode(chequebook))
}

/// Derive a cashout result from the logs of a confirmed receipt.
///
/// Logs emitted by contracts other than the chequebook are ignored. A
/// well-formed cashout emits exactly one `ChequeCashed` event; if several
/// are present the last one wins. Logs that decode as neither event are
/// skipped, so a receipt without chequebook events yields a zero-valued,
/// non-bounced result.
fn parse_cash_cheque_beneficiary_receipt(
    chequebook: Address,
    receipt: &TxReceipt,
) -> CashChequeResult {
    let mut result = CashChequeResult::default();

    for log in &receipt.logs {
        if log.address != chequebook {
            continue;
        }
        if let Ok(event) = contract::parse_cheque_cashed(log) {
            result.beneficiary = event.beneficiary;
            result.caller = event.caller;
            result.caller_payout = event.callerPayout;
            result.total_payout = event.totalPayout;
            result.cumulative_payout = event.cumulativePayout;
            result.recipient = event.recipient;
        } else if contract::parse_cheque_bounced(log).is_ok() {
            result.bounced = true;
        }
    }

    result
}

/// The service responsible for managing cashout actions.
pub struct CashoutService<S, T, C> {
    inner: Arc<CashoutInner<S, T, C>>,
}

impl<S, T, C> Clone for CashoutService<S, T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CashoutInner<S, T, C> {
    store: S,
    transaction: T,
    cheque_store: C,
    /// Serializes the cashout write path: submissions and terminal writes.
    lock: Mutex<()>,
    notify_bounced: OnceLock<NotifyBouncedFn>,
    shutdown: watch::Sender<bool>,
    monitors: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    metrics: CashoutMetrics,
}

impl<S, T, C> CashoutService<S, T, C>
where
    S: StateStore + 'static,
    T: TransactionService + 'static,
    C: ChequeStore + 'static,
{
    /// Create a new cashout service.
    pub fn new(store: S, transaction: T, cheque_store: C) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(CashoutInner {
                store,
                transaction,
                cheque_store,
                lock: Mutex::new(()),
                notify_bounced: OnceLock::new(),
                shutdown,
                monitors: parking_lot::Mutex::new(Vec::new()),
                metrics: CashoutMetrics::default(),
            }),
        }
    }

    /// Install the callback invoked when a cashed cheque bounced.
    ///
    /// The callback can be installed once; later installs are ignored.
    /// Install it before [`start`](Self::start) so no monitor can observe
    /// a bounce before the callback is published.
    pub fn set_notify_bounced(&self, f: NotifyBouncedFn) {
        if self.inner.notify_bounced.set(f).is_err() {
            debug!("bounce notifier already installed");
        }
    }

    /// Resume monitoring of cashout transactions that were in flight when
    /// the previous process exited.
    ///
    /// Scans all recorded cashout actions and re-spawns a receipt monitor
    /// for every action without a terminal outcome. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> Result<(), CashoutError> {
        let mut in_flight = Vec::new();
        self.inner.store.iterate_prefix("cashout_", &mut |_, value| {
            let action: CashoutAction = serde_json::from_slice(value)
                .map_err(|e| StateStoreError::Serialization(e.to_string()))?;
            if action.result.is_none() && !action.reverted {
                in_flight.push((action.cheque.chequebook(), action.tx_hash));
            }
            Ok(false)
        })?;

        for (chequebook, tx_hash) in in_flight {
            debug!(%chequebook, %tx_hash, "resuming cashout monitor");
            self.inner.spawn_monitor(chequebook, tx_hash);
        }

        Ok(())
    }

    /// Submit a cashout transaction for the last cheque of `chequebook`,
    /// paying out to `recipient`.
    ///
    /// Dropping the returned future cancels only the submission; once the
    /// transaction is submitted, receipt monitoring is bound to the
    /// service lifetime and outlives the caller.
    pub async fn cash_cheque(
        &self,
        chequebook: Address,
        recipient: Address,
    ) -> Result<B256, CashoutError> {
        let inner = &self.inner;
        let _guard = inner.lock.lock().await;

        let cheque = inner.cheque_store.last_cheque(chequebook)?;

        let call_data = contract::cash_cheque_beneficiary_call(
            recipient,
            cheque.cheque.cumulative_payout(),
            cheque.signature.clone(),
        );

        let request = TxRequest {
            to: chequebook,
            data: call_data,
            gas_price: None,
            gas_limit: 0,
            value: U256::ZERO,
        };

        let tx_hash = inner.transaction.send(request).await?;

        // A failure past this point leaves the transaction on-chain but
        // untracked until a new action is recorded for the chequebook.
        inner.store.put(
            &cashout_action_key(chequebook),
            &CashoutAction {
                tx_hash,
                cheque,
                result: None,
                reverted: false,
            },
        )?;

        inner.metrics.submitted_total.increment(1);
        debug!(%chequebook, %tx_hash, "submitted cashout transaction");

        inner.spawn_monitor(chequebook, tx_hash);

        Ok(tx_hash)
    }

    /// Get the status of the latest cashout for `chequebook`.
    pub fn cashout_status(&self, chequebook: Address) -> Result<CashoutStatus, CashoutError> {
        let action: CashoutAction = self
            .inner
            .store
            .get(&cashout_action_key(chequebook))?
            .ok_or(CashoutError::NoCashout)?;
        Ok(action.into())
    }

    /// Stop all receipt monitors and wait for them to exit.
    ///
    /// Actions still in flight stay recorded and are re-monitored by the
    /// next [`start`](Self::start). A panicked monitor is contained here
    /// and logged.
    pub async fn close(&self) {
        let _ = self.inner.shutdown.send(true);

        let monitors: Vec<_> = self.inner.monitors.lock().drain(..).collect();
        for monitor in monitors {
            if let Err(err) = monitor.await {
                error!(%err, "cashout monitor task failed");
            }
        }
    }
}

impl<S, T, C> CashoutInner<S, T, C>
where
    S: StateStore + 'static,
    T: TransactionService + 'static,
    C: ChequeStore + 'static,
{
    /// Spawn a background monitor awaiting the receipt of `tx_hash`.
    fn spawn_monitor(self: &Arc<Self>, chequebook: Address, tx_hash: B256) {
        let receipt_watch = self.transaction.watch_for_receipt(tx_hash);
        let mut shutdown = self.shutdown.subscribe();
        let inner = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let ReceiptWatch { receipt, error } = receipt_watch;
            let shutdown_signaled = async {
                loop {
                    if *shutdown.borrow() {
                        return;
                    }
                    if shutdown.changed().await.is_err() {
                        return;
                    }
                }
            };
            tokio::select! {
                _ = shutdown_signaled => {}
                err = error => {
                    // A closed channel means watching ended without an
                    // outcome. Either way the action stays in flight: a
                    // transient watch failure must not be recorded as an
                    // on-chain revert.
                    if let Ok(err) = err {
                        error!(%tx_hash, %err, "failed to monitor cashout transaction");
                    }
                }
                rcpt = receipt => {
                    if let Ok(receipt) = rcpt {
                        if let Err(err) = inner.process_receipt(chequebook, &receipt).await {
                            error!(%chequebook, %err, "could not process cashout receipt");
                        }
                    }
                }
            }
        });

        self.monitors.lock().push(handle);
    }

    /// Record the terminal outcome of a cashout from its receipt.
    async fn process_receipt(
        &self,
        chequebook: Address,
        receipt: &TxReceipt,
    ) -> Result<(), CashoutError> {
        let _guard = self.lock.lock().await;

        let key = cashout_action_key(chequebook);
        let action: CashoutAction = self.store.get(&key)?.ok_or(CashoutError::NoCashout)?;

        // Ignore receipts for superseded submissions; the newer action's
        // own monitor owns the terminal write.
        if receipt.tx_hash != action.tx_hash {
            return Ok(());
        }

        if receipt.status == ReceiptStatus::Failed {
            error!(tx_hash = %action.tx_hash, "cashout transaction reverted");
            self.store.put(
                &key,
                &CashoutAction {
                    tx_hash: action.tx_hash,
                    cheque: action.cheque,
                    result: None,
                    reverted: true,
                },
            )?;
            self.metrics.reverted_total.increment(1);
            return Ok(());
        }

        let result = parse_cash_cheque_beneficiary_receipt(chequebook, receipt);
        if result == CashChequeResult::default() {
            warn!(tx_hash = %receipt.tx_hash, "cashout receipt carried no chequebook events");
        }

        self.store.put(
            &key,
            &CashoutAction {
                tx_hash: action.tx_hash,
                cheque: action.cheque,
                result: Some(result.clone()),
                reverted: false,
            },
        )?;
        self.metrics.confirmed_total.increment(1);

        if result.bounced {
            info!(tx_hash = %receipt.tx_hash, "cashout bounced");
            self.metrics.bounced_total.increment(1);
            match self.notify_bounced.get() {
                Some(notify) => notify(chequebook).map_err(CashoutError::NotifyBounced)?,
                None => warn!(%chequebook, "cheque bounced but no bounce notifier is installed"),
            }
        } else {
            trace!(tx_hash = %receipt.tx_hash, "cashout confirmed");
        }

        Ok(())
    }
}
