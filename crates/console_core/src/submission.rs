//! Drives one gameplay record to an on-chain outcome with at most one send in
//! flight per controller.

use std::{sync::Arc, time::Duration};

use chain::{AbiError, AddInputCall, ChainReader, ChainTarget, ReceiptStatus, WalletSigner};
use shared::domain::{Gameplay, TxHash};
use thiserror::Error;
use tokio::{sync::watch, time::timeout};
use tracing::{error, info, warn};

use crate::{gameplay::GameplayStore, wallet::WalletHandle};

pub const SUBMITTED_MESSAGE: &str = "Submited.";
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit gameplay.";
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("wallet on wrong chain: expected {expected}, wallet reports {actual}")]
    WrongChain { expected: u64, actual: u64 },
    #[error("failed to encode verification payload: {0}")]
    Encode(#[from] AbiError),
    #[error("contract simulation rejected the call: {0:#}")]
    Simulation(anyhow::Error),
    #[error("wallet did not broadcast the transaction: {0:#}")]
    Broadcast(anyhow::Error),
    #[error("no receipt for {tx_hash} within {waited:?}")]
    ReceiptTimeout { tx_hash: TxHash, waited: Duration },
    #[error("failed to confirm transaction receipt: {0:#}")]
    Receipt(anyhow::Error),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Sending,
    Succeeded,
    Failed,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub phase: SubmissionPhase,
    /// Confirmation was seen; the next submit clears instead of re-sending.
    pub submitted: bool,
    pub result: Option<SubmitResult>,
    pub tx_hash: Option<TxHash>,
}

impl SubmissionState {
    pub fn is_sending(&self) -> bool {
        self.phase == SubmissionPhase::Sending
    }

    pub fn confirm_label(&self) -> &'static str {
        match &self.result {
            None => "Confirm",
            Some(result) if result.success => "OK",
            Some(_) => "Try Again",
        }
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_sending() && !self.result.as_ref().is_some_and(|result| result.success)
    }

    pub fn status_line(&self) -> Option<&str> {
        if self.is_sending() {
            return Some("Submitting...");
        }
        self.result.as_ref().map(|result| result.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another send was already in flight.
    Dropped,
    /// The record was already confirmed; this call cleared it.
    Cleared,
    NoRecord,
    NoWallet,
    Succeeded(TxHash),
    Failed,
}

#[derive(Clone)]
pub struct SubmissionController {
    state: Arc<watch::Sender<SubmissionState>>,
    store: GameplayStore,
    wallet: WalletHandle,
    reader: Arc<dyn ChainReader>,
    target: ChainTarget,
    receipt_timeout: Duration,
}

enum Claim {
    Send(Arc<Gameplay>, Arc<dyn WalletSigner>),
    Done(SubmitOutcome),
}

impl SubmissionController {
    pub fn new(
        store: GameplayStore,
        wallet: WalletHandle,
        reader: Arc<dyn ChainReader>,
        target: ChainTarget,
    ) -> Self {
        let (state, _rx) = watch::channel(SubmissionState::default());
        Self {
            state: Arc::new(state),
            store,
            wallet,
            reader,
            target,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_receipt_timeout(mut self, receipt_timeout: Duration) -> Self {
        self.receipt_timeout = receipt_timeout;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn is_sending(&self) -> bool {
        self.state.borrow().is_sending()
    }

    /// Back to a fresh controller for a newly published record.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.is_sending() {
                return false;
            }
            *state = SubmissionState::default();
            true
        });
    }

    /// Clears the record unless a send is outstanding. Returns whether it did.
    pub fn cancel(&self) -> bool {
        let mut cancelled = false;
        self.state.send_if_modified(|state| {
            if state.is_sending() {
                return false;
            }
            self.store.clear();
            *state = SubmissionState {
                phase: SubmissionPhase::Cleared,
                ..SubmissionState::default()
            };
            cancelled = true;
            true
        });
        if cancelled {
            info!("submission: cancelled, gameplay cleared");
        } else {
            warn!("submission: cancel ignored while sending");
        }
        cancelled
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (record, signer) = match self.claim() {
            Claim::Send(record, signer) => (record, signer),
            Claim::Done(outcome) => return outcome,
        };

        info!(
            rule_id = %record.rule_id,
            score = record.claimed_score(),
            player = %signer.address(),
            "submission: sending"
        );
        let result = self.send(&record, signer.as_ref()).await;

        match result {
            Ok(tx_hash) => {
                info!(%tx_hash, "submission: confirmed");
                self.state.send_modify(|state| {
                    state.phase = SubmissionPhase::Succeeded;
                    state.submitted = true;
                    state.tx_hash = Some(tx_hash.clone());
                    state.result = Some(SubmitResult {
                        success: true,
                        message: SUBMITTED_MESSAGE.to_string(),
                    });
                });
                SubmitOutcome::Succeeded(tx_hash)
            }
            Err(err) => {
                error!(error = %err, rule_id = %record.rule_id, "submission: failed");
                self.state.send_modify(|state| {
                    state.phase = SubmissionPhase::Failed;
                    state.result = Some(SubmitResult {
                        success: false,
                        message: SUBMIT_FAILED_MESSAGE.to_string(),
                    });
                });
                SubmitOutcome::Failed
            }
        }
    }

    /// Atomically checks the in-flight guard and marks the controller sending.
    fn claim(&self) -> Claim {
        let mut claim = Claim::Done(SubmitOutcome::Dropped);
        self.state.send_if_modified(|state| {
            if state.is_sending() {
                return false;
            }
            if state.submitted {
                self.store.clear();
                *state = SubmissionState {
                    phase: SubmissionPhase::Cleared,
                    ..SubmissionState::default()
                };
                claim = Claim::Done(SubmitOutcome::Cleared);
                return true;
            }
            let Some(signer) = self.wallet.current() else {
                warn!("submission: no wallet connected");
                claim = Claim::Done(SubmitOutcome::NoWallet);
                return false;
            };
            let Some(record) = self.store.current() else {
                warn!("submission: no gameplay data");
                claim = Claim::Done(SubmitOutcome::NoRecord);
                return false;
            };
            state.phase = SubmissionPhase::Sending;
            claim = Claim::Send(record, signer);
            true
        });
        claim
    }

    async fn send(
        &self,
        record: &Gameplay,
        signer: &dyn WalletSigner,
    ) -> Result<TxHash, SubmissionError> {
        let actual = signer.chain_id();
        if actual != self.target.chain_id {
            return Err(SubmissionError::WrongChain {
                expected: self.target.chain_id,
                actual,
            });
        }

        let call = AddInputCall::for_gameplay(&self.target, record)?;
        let request = self
            .reader
            .simulate_add_input(&signer.address(), &call)
            .await
            .map_err(SubmissionError::Simulation)?;
        let tx_hash = signer
            .write_contract(request)
            .await
            .map_err(SubmissionError::Broadcast)?;
        info!(%tx_hash, "submission: broadcast, waiting for receipt");

        let receipt = timeout(self.receipt_timeout, self.reader.wait_for_receipt(&tx_hash))
            .await
            .map_err(|_| SubmissionError::ReceiptTimeout {
                tx_hash: tx_hash.clone(),
                waited: self.receipt_timeout,
            })?
            .map_err(SubmissionError::Receipt)?;

        match receipt.status {
            ReceiptStatus::Success => Ok(tx_hash),
            ReceiptStatus::Reverted => Err(SubmissionError::Reverted(tx_hash)),
        }
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
