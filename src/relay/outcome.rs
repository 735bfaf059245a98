//! Per-operation results reported by the executor.

use super::contract::RevertReason;
use super::planner::{Slot, UpdateOperation};
use alloy::primitives::B256;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionError {
    /// RPC unreachable or timed out. Retryable next cycle.
    Network { message: String },
    /// Signer lacks the role the contract requires. Not retried.
    Authorization { reason: String },
    /// Rejected by on-chain validation.
    Revert { reason: RevertReason },
    /// Refused by the node before inclusion (nonce, funds, fee).
    Rejected { message: String },
    /// Local signing failed; nothing was sent.
    Signing { message: String },
}

impl SubmissionError {
    /// Classify revert data from a simulation or a node rejection.
    pub fn from_revert(reason: RevertReason) -> Self {
        if reason.is_authorization() {
            Self::Authorization {
                reason: reason.to_string(),
            }
        } else {
            Self::Revert { reason }
        }
    }

    pub fn network(err: impl fmt::Display) -> Self {
        Self::Network {
            message: format!("{:#}", err),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Rejected { .. })
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { message } => write!(f, "network error: {}", message),
            Self::Authorization { reason } => write!(f, "authorization error: {}", reason),
            Self::Revert { reason } => write!(f, "revert: {}", reason),
            Self::Rejected { message } => write!(f, "rejected by node: {}", message),
            Self::Signing { message } => write!(f, "signing failed: {}", message),
        }
    }
}

impl std::error::Error for SubmissionError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayStatus {
    /// Planned only (dry run).
    Planned,
    /// Broadcast; confirmation not awaited or not seen before the timeout.
    Submitted,
    Confirmed { block_number: Option<u64> },
    Failed { error: SubmissionError },
}

impl RelayStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result for one operation (one slot, or the whole batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayOutcome {
    pub slots: Vec<Slot>,
    #[serde(flatten)]
    pub status: RelayStatus,
    pub tx_hash: Option<B256>,
    /// Nonce actually signed with, after compaction.
    pub nonce: Option<u64>,
    pub gas_used: Option<u64>,
    /// Sentinel-flagged fields; non-empty means the value needs operator review.
    pub flagged_fields: Vec<String>,
}

impl RelayOutcome {
    pub fn for_operation(op: &UpdateOperation, status: RelayStatus) -> Self {
        Self {
            slots: op.slots.clone(),
            status,
            tx_hash: None,
            nonce: None,
            gas_used: None,
            flagged_fields: op.flagged_fields.clone(),
        }
    }

    pub fn failed(op: &UpdateOperation, error: SubmissionError) -> Self {
        Self::for_operation(op, RelayStatus::Failed { error })
    }

    /// Failed for a transient reason; the next cycle may well succeed.
    pub fn is_retryable(&self) -> bool {
        match &self.status {
            RelayStatus::Failed { error } => error.is_retryable(),
            _ => false,
        }
    }

    pub fn precision_overflow(&self) -> bool {
        !self.flagged_fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_reverts_are_split_out() {
        assert!(matches!(
            SubmissionError::from_revert(RevertReason::NotBot),
            SubmissionError::Authorization { .. }
        ));
        assert!(matches!(
            SubmissionError::from_revert(RevertReason::DexLengthMismatch),
            SubmissionError::Revert { .. }
        ));
        assert!(SubmissionError::network("timeout").is_retryable());
    }

    #[test]
    fn outcome_serializes_flat() {
        let op = UpdateOperation {
            slots: vec![Slot::Vault],
            calldata: Default::default(),
            nonce: 3,
            gas_limit: 1,
            flagged_fields: vec!["vault.totalCollateralizationRatio".to_string()],
        };
        let outcome = RelayOutcome::for_operation(&op, RelayStatus::Submitted);
        assert!(outcome.precision_overflow());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "submitted");
        assert_eq!(json["slots"][0], "vault");
    }
}
