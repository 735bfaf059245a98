//! Vault (loan) statistics.

use super::records::{Domain, VaultRecord};
use super::WarningLog;
use crate::fixed_point::{Decimal, DecimalSource, Unrepresentable, COUNT_DECIMALS, DEFAULT_DECIMALS};
use crate::ocean::models::StatsData;

/// Digits kept in the intermediate quotient; floors at 18 afterwards.
const RATIO_PRECISION: u32 = 36;

/// `collateral / loan × 100`. A zero loan value is a division by zero.
pub fn collateralization_ratio(
    collateral: Option<f64>,
    loan: Option<f64>,
) -> Result<Decimal, Unrepresentable> {
    let collateral = collateral.to_decimal()?;
    let loan = loan.to_decimal()?;
    collateral
        .mul(&Decimal::from_u64(100))
        .checked_div(&loan, RATIO_PRECISION)
}

pub fn normalize_vault(stats: &StatsData, log: &mut WarningLog) -> VaultRecord {
    let count = &stats.loan.count;
    let value = &stats.loan.value;

    VaultRecord {
        no_of_vaults: log.scale(
            Domain::Vault,
            None,
            "noOfVaultsNoDecimals",
            count.open_vaults,
            COUNT_DECIMALS,
        ),
        total_loan_value: log.scale(
            Domain::Vault,
            None,
            "totalLoanValue",
            value.loan,
            DEFAULT_DECIMALS,
        ),
        total_collateral_value: log.scale(
            Domain::Vault,
            None,
            "totalCollateralValue",
            value.collateral,
            DEFAULT_DECIMALS,
        ),
        total_collateralization_ratio: log.scale(
            Domain::Vault,
            None,
            "totalCollateralizationRatio",
            collateralization_ratio(value.collateral, value.loan),
            DEFAULT_DECIMALS,
        ),
        active_auctions: log.scale(
            Domain::Vault,
            None,
            "activeAuctionsNoDecimals",
            count.open_auctions,
            COUNT_DECIMALS,
        ),
        decimals: DEFAULT_DECIMALS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::MAX_UINT256;
    use crate::normalize::WarningKind;
    use crate::ocean::models::{LoanCount, LoanStats, LoanValue};
    use alloy::primitives::U256;

    fn stats(collateral: Option<f64>, loan: Option<f64>) -> StatsData {
        StatsData {
            loan: LoanStats {
                count: LoanCount {
                    open_vaults: Some(12_345.0),
                    open_auctions: Some(7.0),
                    ..Default::default()
                },
                value: LoanValue { collateral, loan },
            },
            ..Default::default()
        }
    }

    #[test]
    fn ratio_is_floored_percentage() {
        let mut log = WarningLog::new();
        let rec = normalize_vault(&stats(Some(1000.0), Some(3.0)), &mut log);
        // 100000 / 3 = 33333.333... floored at 18 decimals
        assert_eq!(
            rec.total_collateralization_ratio.to_string(),
            "33333333333333333333333"
        );
        assert!(log.is_empty());
    }

    #[test]
    fn counts_are_unscaled() {
        let mut log = WarningLog::new();
        let rec = normalize_vault(&stats(Some(1.0), Some(1.0)), &mut log);
        assert_eq!(rec.no_of_vaults, U256::from(12_345u64));
        assert_eq!(rec.active_auctions, U256::from(7u64));
        assert_eq!(rec.decimals, 18);
    }

    #[test]
    fn zero_loan_value_yields_sentinel_ratio() {
        let mut log = WarningLog::new();
        let rec = normalize_vault(&stats(Some(500.0), Some(0.0)), &mut log);
        assert_eq!(rec.total_collateralization_ratio, MAX_UINT256);
        assert_eq!(rec.total_loan_value, U256::ZERO);

        let warnings = log.into_inner();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "totalCollateralizationRatio");
        assert_eq!(
            warnings[0].kind,
            WarningKind::Sentinel {
                reason: Unrepresentable::DivisionByZero
            }
        );
    }

    #[test]
    fn missing_collateral_propagates_missing() {
        assert_eq!(
            collateralization_ratio(None, Some(1.0)),
            Err(Unrepresentable::Missing)
        );
    }
}
