//! Masternode lock statistics.

use super::records::{Domain, MasterNodeRecord};
use super::WarningLog;
use crate::fixed_point::{COUNT_DECIMALS, DEFAULT_DECIMALS};
use crate::ocean::models::StatsData;

pub const ZERO_YEAR_WEEKS: u32 = 0;
pub const FIVE_YEAR_WEEKS: u32 = 260;
pub const TEN_YEAR_WEEKS: u32 = 520;

fn locked_count(stats: &StatsData, weeks: u32) -> Option<f64> {
    stats
        .masternodes
        .locked
        .iter()
        .find(|b| b.weeks == weeks)
        .and_then(|b| b.count)
}

pub fn normalize_masternode(stats: &StatsData, log: &mut WarningLog) -> MasterNodeRecord {
    let mut count = |field: &str, weeks: u32| {
        log.scale(
            Domain::MasterNode,
            None,
            field,
            locked_count(stats, weeks),
            COUNT_DECIMALS,
        )
    };

    let zero_year_locked = count("zeroYearLockedNoDecimals", ZERO_YEAR_WEEKS);
    let five_year_locked = count("fiveYearLockedNoDecimals", FIVE_YEAR_WEEKS);
    let ten_year_locked = count("tenYearLockedNoDecimals", TEN_YEAR_WEEKS);

    MasterNodeRecord {
        total_value_locked: log.scale(
            Domain::MasterNode,
            None,
            "totalValueLockedInMasterNodes",
            stats.tvl.masternodes,
            DEFAULT_DECIMALS,
        ),
        zero_year_locked,
        five_year_locked,
        ten_year_locked,
        decimals: DEFAULT_DECIMALS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::MAX_UINT256;
    use crate::ocean::models::{MasternodeLockBucket, MasternodeStats, TvlStats};
    use alloy::primitives::U256;

    fn bucket(weeks: u32, count: f64) -> MasternodeLockBucket {
        MasternodeLockBucket {
            weeks,
            count: Some(count),
            tvl: None,
        }
    }

    #[test]
    fn buckets_map_by_weeks_regardless_of_order() {
        let stats = StatsData {
            tvl: TvlStats {
                masternodes: Some(2.5),
                ..Default::default()
            },
            masternodes: MasternodeStats {
                locked: vec![bucket(520, 30.0), bucket(0, 1000.0), bucket(260, 200.0)],
            },
            ..Default::default()
        };
        let mut log = WarningLog::new();
        let rec = normalize_masternode(&stats, &mut log);

        assert_eq!(rec.zero_year_locked, U256::from(1000u64));
        assert_eq!(rec.five_year_locked, U256::from(200u64));
        assert_eq!(rec.ten_year_locked, U256::from(30u64));
        assert_eq!(
            rec.total_value_locked,
            U256::from(2_500_000_000_000_000_000u128)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn missing_bucket_is_sentinel() {
        let stats = StatsData {
            masternodes: MasternodeStats {
                locked: vec![bucket(0, 5.0)],
            },
            ..Default::default()
        };
        let mut log = WarningLog::new();
        let rec = normalize_masternode(&stats, &mut log);
        assert_eq!(rec.ten_year_locked, MAX_UINT256);
        assert_eq!(rec.five_year_locked, MAX_UINT256);
        // two buckets plus the tvl
        assert_eq!(log.len(), 3);
    }
}
