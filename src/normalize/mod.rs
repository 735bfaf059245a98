//! Normalizer
//!
//! Pure transformation from an [`UpstreamSnapshot`] to a
//! [`CanonicalRecordSet`]. Nothing here fails: every field that cannot be
//! represented becomes the sentinel and leaves a [`NormalizationWarning`].

pub mod burn;
pub mod dex;
pub mod masternode;
pub mod oracle;
pub mod records;
pub mod vault;

pub use records::{
    BurnRecord, CanonicalRecordSet, DexAggregateRecord, DexPairRecord, DexRecordSet, Domain,
    MasterNodeRecord, NormalizationWarning, OracleRecord, OracleRecordSet, TokenAmountRecord,
    VaultRecord, WarningKind,
};

use crate::fixed_point::{to_scaled_integer, DecimalSource, ScaledInteger};
use crate::ocean::UpstreamSnapshot;
use alloy::primitives::U256;
use tracing::{info, warn};

/// Quote token used for DEX price derivation.
pub const DEFAULT_DENOMINATION: &str = "USDT";

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub denomination: String,
    pub include_oracle: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            denomination: DEFAULT_DENOMINATION.to_string(),
            include_oracle: false,
        }
    }
}

/// Collects warnings while scaling fields of one snapshot.
#[derive(Debug, Default)]
pub struct WarningLog {
    entries: Vec<NormalizationWarning>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale `value` and record a warning when it lands on the sentinel.
    pub fn scale<V: DecimalSource>(
        &mut self,
        domain: Domain,
        subject: Option<&str>,
        field: &str,
        value: V,
        decimals: u32,
    ) -> U256 {
        let scaled = to_scaled_integer(value, decimals);
        if let ScaledInteger::Unrepresentable(reason) = scaled {
            self.push(NormalizationWarning {
                domain,
                subject: subject.map(str::to_string),
                field: field.to_string(),
                kind: WarningKind::Sentinel { reason },
            });
        }
        scaled.to_u256()
    }

    pub fn malformed(
        &mut self,
        domain: Domain,
        list: &str,
        entry: &str,
        problem: impl Into<String>,
    ) {
        self.push(NormalizationWarning {
            domain,
            subject: Some(list.to_string()),
            field: "entry".to_string(),
            kind: WarningKind::MalformedEntry {
                entry: entry.to_string(),
                problem: problem.into(),
            },
        });
    }

    fn push(&mut self, warning: NormalizationWarning) {
        warn!(domain = warning.domain.as_str(), "⚠️  {}", warning);
        self.entries.push(warning);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Vec<NormalizationWarning> {
        self.entries
    }
}

/// Build every canonical record for one cycle.
pub fn normalize_snapshot(
    snapshot: &UpstreamSnapshot,
    options: &NormalizeOptions,
) -> CanonicalRecordSet {
    let mut log = WarningLog::new();

    let dex = dex::normalize_dex(
        &snapshot.pool_pairs,
        &snapshot.stats,
        &snapshot.dex_prices,
        &options.denomination,
        &mut log,
    );
    let master_node = masternode::normalize_masternode(&snapshot.stats, &mut log);
    let vault = vault::normalize_vault(&snapshot.stats, &mut log);
    let burn = burn::normalize_burn(&snapshot.burn, &mut log);
    let oracle = options
        .include_oracle
        .then(|| oracle::normalize_oracle(&snapshot.price_tickers, &mut log));

    let warnings = log.into_inner();
    info!(
        pairs = dex.pairs.len(),
        oracle_tickers = oracle.as_ref().map(|o| o.records.len()).unwrap_or(0),
        warnings = warnings.len(),
        "🧮 Snapshot normalized"
    );

    CanonicalRecordSet {
        dex,
        master_node,
        vault,
        burn,
        oracle,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::{Unrepresentable, MAX_UINT256};
    use crate::ocean::models::{LoanValue, StatsData};

    #[test]
    fn warning_log_records_sentinel_reason() {
        let mut log = WarningLog::new();
        let v = log.scale(Domain::Vault, None, "totalLoanValue", f64::NAN, 18);
        assert_eq!(v, MAX_UINT256);
        let ok = log.scale(Domain::Vault, None, "totalCollateralValue", 1.5f64, 18);
        assert_eq!(ok, U256::from(1_500_000_000_000_000_000u128));

        let warnings = log.into_inner();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].kind,
            WarningKind::Sentinel {
                reason: Unrepresentable::NotFinite
            }
        );
        assert_eq!(warnings[0].path(), "vault.totalLoanValue");
    }

    #[test]
    fn empty_snapshot_normalizes_to_sentinels_not_errors() {
        let snapshot = UpstreamSnapshot::default();
        let records = normalize_snapshot(&snapshot, &NormalizeOptions::default());

        assert!(records.dex.pairs.is_empty());
        assert_eq!(records.dex.aggregate.total_24h_volume, U256::ZERO);
        assert_eq!(records.dex.aggregate.total_value_locked, MAX_UINT256);
        assert_eq!(records.vault.total_loan_value, MAX_UINT256);
        assert!(records.oracle.is_none());
        assert!(!records.warnings.is_empty());
    }

    #[test]
    fn oracle_domain_only_built_when_requested() {
        let snapshot = UpstreamSnapshot {
            stats: StatsData {
                loan: crate::ocean::models::LoanStats {
                    value: LoanValue {
                        collateral: Some(200.0),
                        loan: Some(100.0),
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let options = NormalizeOptions {
            include_oracle: true,
            ..Default::default()
        };
        let records = normalize_snapshot(&snapshot, &options);
        assert_eq!(records.oracle.as_ref().map(|o| o.records.len()), Some(0));
        assert_eq!(
            records.vault.total_collateralization_ratio,
            U256::from(200u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert!(records
            .flagged_fields(&[Domain::Vault])
            .iter()
            .all(|p| p.starts_with("vault.")));
    }
}
