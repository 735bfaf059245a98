//! Update planning
//!
//! Turns a [`CanonicalRecordSet`] into an ordered list of signed-ready
//! operations. No I/O happens here; the nonce and fees come in through the
//! [`SigningContext`] that was read once for the cycle.

use super::contract::{self, SchemaVersion};
use super::fees::{FeeParams, SigningContext};
use crate::normalize::records::{CanonicalRecordSet, Domain};
use alloy::primitives::{Address, Bytes};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// One named category of published data. Declaration order is publication
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Dex,
    MasterNode,
    Vault,
    Burn,
    Oracle,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::Dex,
        Slot::MasterNode,
        Slot::Vault,
        Slot::Burn,
        Slot::Oracle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dex => "dex",
            Self::MasterNode => "master_node",
            Self::Vault => "vault",
            Self::Burn => "burn",
            Self::Oracle => "oracle",
        }
    }

    /// Normalization domains whose warnings belong to this slot.
    pub fn domains(&self) -> &'static [Domain] {
        match self {
            Self::Dex => &[Domain::DexPair, Domain::DexAggregate],
            Self::MasterNode => &[Domain::MasterNode],
            Self::Vault => &[Domain::Vault],
            Self::Burn => &[Domain::Burn],
            Self::Oracle => &[Domain::Oracle],
        }
    }

    pub fn supported_by(&self, version: SchemaVersion) -> bool {
        !matches!(self, Self::Oracle) || version.has_oracle_slot()
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dex" => Ok(Self::Dex),
            "master_node" | "masternode" | "mn" => Ok(Self::MasterNode),
            "vault" => Ok(Self::Vault),
            "burn" => Ok(Self::Burn),
            "oracle" => Ok(Self::Oracle),
            other => Err(format!("unknown slot: {}", other)),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// One transaction per slot, nonces `base..base+N`.
    Independent,
    /// All slots in one atomic `batchCallByBot` transaction.
    Batched,
}

/// Gas limit per slot. `batch` overrides the summed limit in batched mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasLimits {
    pub dex: u64,
    pub master_node: u64,
    pub vault: u64,
    pub burn: u64,
    pub oracle: u64,
    pub batch: Option<u64>,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            dex: 3_000_000,
            master_node: 200_000,
            vault: 250_000,
            burn: 1_500_000,
            oracle: 2_000_000,
            batch: None,
        }
    }
}

impl GasLimits {
    pub fn for_slot(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Dex => self.dex,
            Slot::MasterNode => self.master_node,
            Slot::Vault => self.vault,
            Slot::Burn => self.burn,
            Slot::Oracle => self.oracle,
        }
    }
}

/// A single transaction to be signed and sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOperation {
    /// One slot, or every slot wrapped by a batch.
    pub slots: Vec<Slot>,
    #[serde(skip)]
    pub calldata: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Sentinel-flagged field paths carried by this operation.
    pub flagged_fields: Vec<String>,
}

impl UpdateOperation {
    pub fn label(&self) -> String {
        self.slots
            .iter()
            .map(Slot::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub version: SchemaVersion,
    pub mode: SubmissionMode,
    pub target: Address,
    pub signer: Address,
    pub chain_id: u64,
    pub fees: FeeParams,
    pub operations: Vec<UpdateOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    LengthMismatch {
        slot: Slot,
        symbols: usize,
        records: usize,
    },
    UnsupportedSlot {
        slot: Slot,
        version: SchemaVersion,
    },
    EmptyPlan,
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                slot,
                symbols,
                records,
            } => write!(
                f,
                "{} has {} symbols but {} records",
                slot, symbols, records
            ),
            Self::UnsupportedSlot { slot, version } => {
                write!(f, "slot {} is not supported by schema {}", slot, version)
            }
            Self::EmptyPlan => f.write_str("no slots to publish"),
        }
    }
}

impl std::error::Error for PlanningError {}

#[derive(Debug, Clone)]
pub struct UpdatePlanner {
    pub version: SchemaVersion,
    pub mode: SubmissionMode,
    pub target: Address,
    /// Slots to publish; sorted into publication order by `plan`.
    pub slots: Vec<Slot>,
    pub gas: GasLimits,
}

impl UpdatePlanner {
    pub fn plan(
        &self,
        records: &CanonicalRecordSet,
        ctx: &SigningContext,
    ) -> Result<UpdatePlan, PlanningError> {
        let mut slots = self.slots.clone();
        slots.sort();
        slots.dedup();

        let mut encoded: Vec<(Slot, Bytes)> = Vec::with_capacity(slots.len());
        for slot in slots {
            if !slot.supported_by(self.version) {
                return Err(PlanningError::UnsupportedSlot {
                    slot,
                    version: self.version,
                });
            }
            if let Some(calldata) = self.encode_slot(slot, records)? {
                encoded.push((slot, calldata));
            }
        }

        if encoded.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }

        let operations = match self.mode {
            SubmissionMode::Independent => encoded
                .into_iter()
                .enumerate()
                .map(|(i, (slot, calldata))| UpdateOperation {
                    slots: vec![slot],
                    calldata,
                    nonce: ctx.base_nonce + i as u64,
                    gas_limit: self.gas.for_slot(slot),
                    flagged_fields: records.flagged_fields(slot.domains()),
                })
                .collect(),
            SubmissionMode::Batched => {
                let slots: Vec<Slot> = encoded.iter().map(|(s, _)| *s).collect();
                let gas_limit = self
                    .gas
                    .batch
                    .unwrap_or_else(|| slots.iter().map(|s| self.gas.for_slot(*s)).sum());
                let domains: Vec<Domain> = slots
                    .iter()
                    .flat_map(|s| s.domains().iter().copied())
                    .collect();
                let calldata =
                    contract::encode_batch(encoded.into_iter().map(|(_, c)| c).collect());
                vec![UpdateOperation {
                    slots,
                    calldata,
                    nonce: ctx.base_nonce,
                    gas_limit,
                    flagged_fields: records.flagged_fields(&domains),
                }]
            }
        };

        debug!(
            version = self.version.as_str(),
            operations = operations.len(),
            base_nonce = ctx.base_nonce,
            "Update plan built"
        );

        Ok(UpdatePlan {
            version: self.version,
            mode: self.mode,
            target: self.target,
            signer: ctx.signer,
            chain_id: ctx.chain_id,
            fees: ctx.fees,
            operations,
        })
    }

    /// `None` when the slot has no data this cycle (oracle not fetched).
    fn encode_slot(
        &self,
        slot: Slot,
        records: &CanonicalRecordSet,
    ) -> Result<Option<Bytes>, PlanningError> {
        let calldata = match slot {
            Slot::Dex => {
                check_lengths(slot, records.dex.symbols.len(), records.dex.pairs.len())?;
                contract::encode_dex(self.version, &records.dex)
            }
            Slot::MasterNode => contract::encode_master_node(self.version, &records.master_node),
            Slot::Vault => contract::encode_vault(self.version, &records.vault),
            Slot::Burn => contract::encode_burn(self.version, &records.burn),
            Slot::Oracle => match &records.oracle {
                Some(oracle) if !oracle.symbols.is_empty() || !oracle.records.is_empty() => {
                    check_lengths(slot, oracle.symbols.len(), oracle.records.len())?;
                    contract::encode_oracle(oracle)
                }
                _ => {
                    debug!("Oracle slot skipped, no oracle records");
                    return Ok(None);
                }
            },
        };
        Ok(Some(calldata))
    }
}

fn check_lengths(slot: Slot, symbols: usize, records: usize) -> Result<(), PlanningError> {
    if symbols != records {
        return Err(PlanningError::LengthMismatch {
            slot,
            symbols,
            records,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_snapshot, NormalizeOptions, OracleRecord, OracleRecordSet};
    use crate::ocean::UpstreamSnapshot;
    use crate::relay::contract::{IStateRelayerV2, SchemaVersion};
    use alloy::primitives::U256;
    use alloy::sol_types::SolCall;
    use std::collections::HashSet;

    fn ctx(base_nonce: u64) -> SigningContext {
        SigningContext {
            signer: Address::repeat_byte(0x11),
            chain_id: 1133,
            base_nonce,
            fees: FeeParams::Legacy { gas_price: 10 },
        }
    }

    fn planner(mode: SubmissionMode, slots: &[Slot]) -> UpdatePlanner {
        UpdatePlanner {
            version: SchemaVersion::V2,
            mode,
            target: Address::repeat_byte(0x22),
            slots: slots.to_vec(),
            gas: GasLimits::default(),
        }
    }

    fn records(include_oracle: bool) -> CanonicalRecordSet {
        let mut records = normalize_snapshot(
            &UpstreamSnapshot::default(),
            &NormalizeOptions {
                include_oracle,
                ..Default::default()
            },
        );
        if let Some(oracle) = records.oracle.as_mut() {
            oracle.symbols.push("BTC-USD".to_string());
            oracle.records.push(OracleRecord {
                price: U256::from(27_000u64),
                ticker_type: "CRYPTO".to_string(),
                oracles_active: U256::from(3u64),
                oracles_total: U256::from(4u64),
                decimals: 18,
            });
        }
        records
    }

    #[test]
    fn independent_nonces_are_contiguous_and_ordered() {
        // deliberately unordered input
        let slots = [Slot::Burn, Slot::Vault, Slot::Dex, Slot::Oracle, Slot::MasterNode];
        let plan = planner(SubmissionMode::Independent, &slots)
            .plan(&records(true), &ctx(41))
            .unwrap();

        let order: Vec<Slot> = plan.operations.iter().map(|op| op.slots[0]).collect();
        assert_eq!(order, Slot::ALL.to_vec());

        let nonces: Vec<u64> = plan.operations.iter().map(|op| op.nonce).collect();
        assert_eq!(nonces, vec![41, 42, 43, 44, 45]);
        let unique: HashSet<u64> = nonces.iter().copied().collect();
        assert_eq!(unique.len(), nonces.len());
    }

    #[test]
    fn batched_mode_wraps_everything_in_one_operation() {
        let plan = planner(SubmissionMode::Batched, &[Slot::Dex, Slot::Vault])
            .plan(&records(false), &ctx(7))
            .unwrap();
        assert_eq!(plan.operations.len(), 1);

        let op = &plan.operations[0];
        assert_eq!(op.slots, vec![Slot::Dex, Slot::Vault]);
        assert_eq!(op.nonce, 7);
        assert_eq!(op.gas_limit, 3_000_000 + 250_000);
        let decoded = IStateRelayerV2::batchCallByBotCall::abi_decode(&op.calldata).unwrap();
        assert_eq!(decoded.funcCalls.len(), 2);
    }

    #[test]
    fn length_mismatch_is_caught_before_submission() {
        let mut recs = records(false);
        recs.dex.symbols.push("dGHOST-DFI".to_string());
        let err = planner(SubmissionMode::Independent, &[Slot::Dex])
            .plan(&recs, &ctx(0))
            .unwrap_err();
        assert_eq!(
            err,
            PlanningError::LengthMismatch {
                slot: Slot::Dex,
                symbols: 1,
                records: 0
            }
        );
    }

    #[test]
    fn oracle_slot_rejected_on_v1() {
        let mut p = planner(SubmissionMode::Independent, &[Slot::Dex, Slot::Oracle]);
        p.version = SchemaVersion::V1;
        assert!(matches!(
            p.plan(&records(true), &ctx(0)),
            Err(PlanningError::UnsupportedSlot {
                slot: Slot::Oracle,
                ..
            })
        ));
    }

    #[test]
    fn oracle_slot_skipped_without_tickers() {
        let mut recs = records(true);
        recs.oracle = Some(OracleRecordSet {
            symbols: Vec::new(),
            records: Vec::new(),
        });
        let plan = planner(SubmissionMode::Independent, &[Slot::Vault, Slot::Oracle])
            .plan(&recs, &ctx(0))
            .unwrap();
        assert_eq!(plan.operations.len(), 1);
        assert_eq!(plan.operations[0].slots, vec![Slot::Vault]);
    }

    #[test]
    fn empty_plan_is_an_error() {
        let err = planner(SubmissionMode::Batched, &[Slot::Oracle])
            .plan(&records(false), &ctx(0))
            .unwrap_err();
        assert_eq!(err, PlanningError::EmptyPlan);
    }

    #[test]
    fn flagged_fields_follow_their_slot() {
        let plan = planner(SubmissionMode::Independent, &[Slot::Dex, Slot::Vault])
            .plan(&records(false), &ctx(0))
            .unwrap();
        assert!(plan.operations[0]
            .flagged_fields
            .iter()
            .all(|f| f.starts_with("dex_")));
        assert!(plan.operations[1]
            .flagged_fields
            .iter()
            .all(|f| f.starts_with("vault.")));
        assert!(!plan.operations[1].flagged_fields.is_empty());
    }
}
