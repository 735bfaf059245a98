//! Canonical per-domain records
//!
//! Every numeric field is a scaled `uint256`; `decimals` states the scale of
//! the amount fields. Count fields (`*_locked`, `no_of_vaults`,
//! `active_auctions`) are always unscaled.

use crate::fixed_point::Unrepresentable;
use alloy::primitives::U256;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    DexPair,
    DexAggregate,
    Vault,
    MasterNode,
    Burn,
    Oracle,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DexPair => "dex_pair",
            Self::DexAggregate => "dex_aggregate",
            Self::Vault => "vault",
            Self::MasterNode => "master_node",
            Self::Burn => "burn",
            Self::Oracle => "oracle",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Field was published as the `MAX_UINT256` sentinel.
    Sentinel { reason: Unrepresentable },
    /// A compact `amount@SYMBOL` entry could not be parsed and was dropped.
    MalformedEntry { entry: String, problem: String },
}

/// Non-fatal normalization issue, recorded per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationWarning {
    pub domain: Domain,
    /// Pair symbol, ticker id or burn list name, when the field belongs to one.
    pub subject: Option<String>,
    pub field: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl NormalizationWarning {
    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, WarningKind::Sentinel { .. })
    }

    /// `domain[.subject].field`
    pub fn path(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{}.{}.{}", self.domain, subject, self.field),
            None => format!("{}.{}", self.domain, self.field),
        }
    }
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::Sentinel { reason } => {
                write!(f, "{} published as sentinel ({})", self.path(), reason)
            }
            WarningKind::MalformedEntry { entry, problem } => {
                write!(f, "{} dropped entry {:?}: {}", self.path(), entry, problem)
            }
        }
    }
}

// =============================================================================
// DEX
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexPairRecord {
    pub primary_token_price: U256,
    pub volume_24h: U256,
    pub total_liquidity: U256,
    pub apr: U256,
    pub first_token_balance: U256,
    pub second_token_balance: U256,
    pub rewards: U256,
    pub commissions: U256,
    pub decimals: u32,
}

impl DexPairRecord {
    pub fn fields(&self) -> Vec<(&'static str, U256)> {
        vec![
            ("primaryTokenPrice", self.primary_token_price),
            ("volume24H", self.volume_24h),
            ("totalLiquidity", self.total_liquidity),
            ("APR", self.apr),
            ("firstTokenBalance", self.first_token_balance),
            ("secondTokenBalance", self.second_token_balance),
            ("rewards", self.rewards),
            ("commissions", self.commissions),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexAggregateRecord {
    pub total_value_locked: U256,
    pub total_24h_volume: U256,
    pub decimals: u32,
}

/// DEX slot payload. `symbols[i]` names `pairs[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexRecordSet {
    pub symbols: Vec<String>,
    pub pairs: Vec<DexPairRecord>,
    pub aggregate: DexAggregateRecord,
}

// =============================================================================
// VAULT / MASTERNODE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultRecord {
    pub no_of_vaults: U256,
    pub total_loan_value: U256,
    pub total_collateral_value: U256,
    pub total_collateralization_ratio: U256,
    pub active_auctions: U256,
    pub decimals: u32,
}

impl VaultRecord {
    pub fn fields(&self) -> Vec<(&'static str, U256)> {
        vec![
            ("noOfVaultsNoDecimals", self.no_of_vaults),
            ("totalLoanValue", self.total_loan_value),
            ("totalCollateralValue", self.total_collateral_value),
            ("totalCollateralizationRatio", self.total_collateralization_ratio),
            ("activeAuctionsNoDecimals", self.active_auctions),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterNodeRecord {
    pub total_value_locked: U256,
    pub zero_year_locked: U256,
    pub five_year_locked: U256,
    pub ten_year_locked: U256,
    pub decimals: u32,
}

impl MasterNodeRecord {
    pub fn fields(&self) -> Vec<(&'static str, U256)> {
        vec![
            ("totalValueLockedInMasterNodes", self.total_value_locked),
            ("zeroYearLockedNoDecimals", self.zero_year_locked),
            ("fiveYearLockedNoDecimals", self.five_year_locked),
            ("tenYearLockedNoDecimals", self.ten_year_locked),
        ]
    }
}

// =============================================================================
// BURN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAmountRecord {
    pub amount: U256,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurnRecord {
    pub address: String,
    pub amount: U256,
    pub tokens: Vec<TokenAmountRecord>,
    pub feeburn: U256,
    pub emissionburn: U256,
    pub auctionburn: U256,
    pub paybackburn: U256,
    pub paybackburntokens: Vec<TokenAmountRecord>,
    pub dexfeetokens: Vec<TokenAmountRecord>,
    pub dfipaybackfee: U256,
    pub dfipaybacktokens: Vec<TokenAmountRecord>,
    pub paybackfees: Vec<TokenAmountRecord>,
    pub paybacktokens: Vec<TokenAmountRecord>,
    pub dfip2203: Vec<TokenAmountRecord>,
    pub dfip2206f: Vec<TokenAmountRecord>,
    pub decimals: u32,
}

// =============================================================================
// ORACLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRecord {
    pub price: U256,
    pub ticker_type: String,
    pub oracles_active: U256,
    pub oracles_total: U256,
    pub decimals: u32,
}

/// Oracle slot payload. `symbols[i]` names `records[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRecordSet {
    pub symbols: Vec<String>,
    pub records: Vec<OracleRecord>,
}

/// Output of one normalization pass.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecordSet {
    pub dex: DexRecordSet,
    pub master_node: MasterNodeRecord,
    pub vault: VaultRecord,
    pub burn: BurnRecord,
    pub oracle: Option<OracleRecordSet>,
    pub warnings: Vec<NormalizationWarning>,
}

impl CanonicalRecordSet {
    /// Sentinel-flagged field paths for the given domains.
    pub fn flagged_fields(&self, domains: &[Domain]) -> Vec<String> {
        self.warnings
            .iter()
            .filter(|w| w.is_sentinel() && domains.contains(&w.domain))
            .map(NormalizationWarning::path)
            .collect()
    }
}
