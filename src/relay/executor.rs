//! Relay Executor
//!
//! Signs and submits the operations of an [`UpdatePlan`], in nonce order,
//! and reports one [`RelayOutcome`] per operation. Nothing is retried within
//! a cycle; the next cycle republishes the full snapshot.
//!
//! Operations are pipelined: each is broadcast without waiting for the
//! previous one to confirm. Confirmations (when enabled) are awaited
//! together at the end.
//!
//! A nonce is handed to the next operation only when the current one was
//! definitely not broadcast. A send that fails in transport may still have
//! reached the node, so its nonce stays spent.

use super::contract::{decode_revert, RevertReason};
use super::fees::FeeParams;
use super::outcome::{RelayOutcome, RelayStatus, SubmissionError};
use super::planner::{UpdateOperation, UpdatePlan};
use super::rpc::{CallOutcome, CallRequest, ChainTransport, SendOutcome, TxReceipt};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip2930::AccessList;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// `eth_call` each operation before broadcasting it.
    pub simulate: bool,
    /// Wait for receipts before reporting.
    pub await_confirmations: bool,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            simulate: true,
            await_confirmations: true,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// A broadcast transaction still waiting for its receipt.
struct Pending {
    index: usize,
    hash: B256,
    calldata: Bytes,
    gas_limit: u64,
}

pub struct RelayExecutor {
    transport: Arc<dyn ChainTransport>,
    signer: PrivateKeySigner,
    config: ExecutorConfig,
}

impl std::fmt::Debug for RelayExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayExecutor")
            .field("transport", &self.transport.name())
            .field("signer", &self.signer.address())
            .field("config", &self.config)
            .finish()
    }
}

impl RelayExecutor {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        signer: PrivateKeySigner,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            transport,
            signer,
            config,
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn transport(&self) -> &dyn ChainTransport {
        self.transport.as_ref()
    }

    /// Sign one operation at `nonce`. Returns the raw 2718 envelope and its hash.
    pub fn sign(
        &self,
        plan: &UpdatePlan,
        op: &UpdateOperation,
        nonce: u64,
    ) -> Result<(Vec<u8>, B256), SubmissionError> {
        let signing_error = |e: alloy::signers::Error| SubmissionError::Signing {
            message: e.to_string(),
        };

        let envelope: TxEnvelope = match plan.fees {
            FeeParams::Legacy { gas_price } => {
                let mut tx = TxLegacy {
                    chain_id: Some(plan.chain_id),
                    nonce,
                    gas_price,
                    gas_limit: op.gas_limit,
                    to: TxKind::Call(plan.target),
                    value: U256::ZERO,
                    input: op.calldata.clone(),
                };
                let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
                    .map_err(signing_error)?;
                tx.into_signed(sig).into()
            }
            FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut tx = TxEip1559 {
                    chain_id: plan.chain_id,
                    nonce,
                    max_priority_fee_per_gas,
                    max_fee_per_gas,
                    gas_limit: op.gas_limit,
                    to: TxKind::Call(plan.target),
                    value: U256::ZERO,
                    access_list: AccessList::default(),
                    input: op.calldata.clone(),
                };
                let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
                    .map_err(signing_error)?;
                tx.into_signed(sig).into()
            }
        };

        Ok((envelope.encoded_2718(), *envelope.tx_hash()))
    }

    /// Pre-flight `eth_call`. `Ok(())` means the call would succeed.
    async fn simulate(
        &self,
        plan: &UpdatePlan,
        calldata: &Bytes,
        gas_limit: u64,
    ) -> Result<(), SubmissionError> {
        let request = CallRequest {
            from: plan.signer,
            to: plan.target,
            data: calldata.clone(),
            gas: Some(gas_limit),
        };
        match self.transport.call(&request).await {
            Ok(CallOutcome::Success(_)) => Ok(()),
            Ok(CallOutcome::Reverted { message, data }) => {
                Err(SubmissionError::from_revert(revert_reason(&message, &data)))
            }
            Err(e) => Err(SubmissionError::network(e)),
        }
    }

    /// Submit every operation of `plan`. Never fails as a whole; each
    /// operation gets its own outcome.
    pub async fn execute(&self, plan: &UpdatePlan) -> Vec<RelayOutcome> {
        let mut outcomes: Vec<RelayOutcome> = Vec::with_capacity(plan.operations.len());
        let mut pending: Vec<Pending> = Vec::new();
        let mut next_nonce = match plan.operations.first() {
            Some(op) => op.nonce,
            None => return outcomes,
        };

        for op in &plan.operations {
            let label = op.label();

            if self.config.simulate {
                if let Err(error) = self.simulate(plan, &op.calldata, op.gas_limit).await {
                    warn!(slots = %label, error = %error, "❌ Simulation failed, not broadcasting");
                    outcomes.push(RelayOutcome::failed(op, error));
                    continue;
                }
            }

            if next_nonce != op.nonce {
                debug!(slots = %label, planned = op.nonce, signed = next_nonce, "Nonce compacted");
            }

            let (raw, hash) = match self.sign(plan, op, next_nonce) {
                Ok(signed) => signed,
                Err(error) => {
                    warn!(slots = %label, error = %error, "❌ Signing failed");
                    outcomes.push(RelayOutcome::failed(op, error));
                    continue;
                }
            };

            let mut outcome = RelayOutcome::for_operation(op, RelayStatus::Submitted);
            match self.transport.send_raw_transaction(&raw).await {
                Ok(SendOutcome::Accepted(accepted)) => {
                    if accepted != hash {
                        warn!(local = %hash, node = %accepted, "Node reported a different tx hash");
                    }
                    info!(
                        slots = %label,
                        nonce = next_nonce,
                        tx_hash = %accepted,
                        flagged = op.flagged_fields.len(),
                        "📤 Transaction submitted"
                    );
                    outcome.tx_hash = Some(accepted);
                    outcome.nonce = Some(next_nonce);
                    pending.push(Pending {
                        index: outcomes.len(),
                        hash: accepted,
                        calldata: op.calldata.clone(),
                        gas_limit: op.gas_limit,
                    });
                    next_nonce += 1;
                }
                Ok(SendOutcome::Rejected { message, data }) => {
                    let error = if data.is_empty() {
                        SubmissionError::Rejected { message }
                    } else {
                        SubmissionError::from_revert(decode_revert(&data))
                    };
                    warn!(slots = %label, error = %error, "❌ Transaction rejected");
                    outcome.status = RelayStatus::Failed { error };
                }
                Err(e) => {
                    // the node may still have the tx: the nonce counts as spent and
                    // the locally computed hash is tracked like an accepted one
                    warn!(
                        slots = %label,
                        nonce = next_nonce,
                        tx_hash = %hash,
                        error = %format!("{:#}", e),
                        "⚠️  Broadcast outcome unknown, tracking locally signed hash"
                    );
                    outcome.tx_hash = Some(hash);
                    outcome.nonce = Some(next_nonce);
                    pending.push(Pending {
                        index: outcomes.len(),
                        hash,
                        calldata: op.calldata.clone(),
                        gas_limit: op.gas_limit,
                    });
                    next_nonce += 1;
                }
            }
            outcomes.push(outcome);
        }

        if self.config.await_confirmations && !pending.is_empty() {
            self.await_confirmations(plan, pending, &mut outcomes).await;
        }

        outcomes
    }

    async fn await_confirmations(
        &self,
        plan: &UpdatePlan,
        pending: Vec<Pending>,
        outcomes: &mut [RelayOutcome],
    ) {
        let waits = pending.iter().map(|p| self.wait_for_receipt(p.hash));
        let receipts = join_all(waits).await;

        for (p, receipt) in pending.iter().zip(receipts) {
            let outcome = &mut outcomes[p.index];
            match receipt {
                Some(r) if r.success => {
                    info!(tx_hash = %p.hash, block = ?r.block_number, gas_used = r.gas_used, "✅ Confirmed");
                    outcome.gas_used = Some(r.gas_used);
                    outcome.status = RelayStatus::Confirmed {
                        block_number: r.block_number,
                    };
                }
                Some(r) => {
                    // receipts carry no revert data; replay to recover the reason
                    let error = match self.simulate(plan, &p.calldata, p.gas_limit).await {
                        Err(SubmissionError::Network { .. }) | Ok(()) => {
                            SubmissionError::Revert {
                                reason: RevertReason::Unknown(String::new()),
                            }
                        }
                        Err(e) => e,
                    };
                    warn!(tx_hash = %p.hash, error = %error, "❌ Reverted on-chain");
                    outcome.gas_used = Some(r.gas_used);
                    outcome.status = RelayStatus::Failed { error };
                }
                None => {
                    warn!(tx_hash = %p.hash, "⏳ Confirmation timed out, left as submitted");
                }
            }
        }
    }

    /// Poll for a receipt until the confirmation timeout. `None` on timeout.
    async fn wait_for_receipt(&self, hash: B256) -> Option<TxReceipt> {
        let poll = async {
            loop {
                match self.transport.transaction_receipt(hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => debug!(tx_hash = %hash, error = %e, "Receipt poll failed"),
                }
                sleep(self.config.poll_interval).await;
            }
        };
        timeout(self.config.confirmation_timeout, poll).await.ok()
    }
}

/// Revert data when present, otherwise the node's message.
fn revert_reason(message: &str, data: &Bytes) -> RevertReason {
    if data.is_empty() {
        RevertReason::Message(message.to_string())
    } else {
        decode_revert(data)
    }
}
