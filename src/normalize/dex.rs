//! DEX pair and aggregate normalization.

use super::records::{DexAggregateRecord, DexPairRecord, DexRecordSet, Domain};
use super::WarningLog;
use crate::fixed_point::{Decimal, DecimalSource, Unrepresentable, DEFAULT_DECIMALS};
use crate::ocean::models::{DexPricesResult, PoolPairData, StatsData};
use std::collections::HashMap;
use tracing::debug;

/// Display symbols containing this are composite listings and are skipped.
pub const COMPOSITE_SEPARATOR: char = '/';

/// Pairs eligible for publication, deduplicated by display symbol.
///
/// A repeated symbol keeps the slot of its first occurrence and the values
/// of its last one, the same as a symbol-keyed map rebuilt in listing order.
/// The aggregate volume is summed over the deduplicated list, so it always
/// equals the sum of the published per-pair volumes.
pub fn eligible_pairs(pairs: &[PoolPairData]) -> Vec<&PoolPairData> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut eligible: Vec<&PoolPairData> = Vec::new();
    for pair in pairs
        .iter()
        .filter(|p| !p.display_symbol.contains(COMPOSITE_SEPARATOR))
    {
        match slots.get(pair.display_symbol.as_str()) {
            Some(&slot) => {
                debug!(symbol = %pair.display_symbol, "Duplicate pool pair, later listing wins");
                eligible[slot] = pair;
            }
            None => {
                slots.insert(pair.display_symbol.as_str(), eligible.len());
                eligible.push(pair);
            }
        }
    }
    eligible
}

/// Price of the pair's primary token expressed in `denomination`.
///
/// `ba` is used directly when the pair is already quoted in the denomination
/// or the ratio is zero; otherwise it is multiplied by the quote token's
/// denomination price.
pub fn primary_token_price(
    pair: &PoolPairData,
    prices: &DexPricesResult,
    denomination: &str,
) -> Result<Decimal, Unrepresentable> {
    let ratio = Decimal::parse(&pair.price_ratio.ba)?;
    if pair.token_b.symbol == denomination || ratio.is_zero() {
        return Ok(ratio);
    }

    let quote = prices
        .dex_prices
        .get(&pair.token_b.symbol)
        .ok_or(Unrepresentable::Missing)?;
    let quote_price = Decimal::parse(&quote.denomination_price)?;
    Ok(ratio.mul(&quote_price))
}

/// Exact sum of 24h volume over `pairs`; a pair without volume adds zero.
pub fn total_24h_volume(pairs: &[&PoolPairData]) -> Result<Decimal, Unrepresentable> {
    pairs.iter().try_fold(Decimal::zero(), |acc, pair| {
        let volume = match &pair.volume {
            Some(v) => v.h24.to_decimal()?,
            None => Decimal::zero(),
        };
        Ok(acc.add(&volume))
    })
}

pub fn normalize_dex(
    pairs: &[PoolPairData],
    stats: &StatsData,
    prices: &DexPricesResult,
    denomination: &str,
    log: &mut WarningLog,
) -> DexRecordSet {
    let eligible = eligible_pairs(pairs);
    let mut symbols = Vec::with_capacity(eligible.len());
    let mut records = Vec::with_capacity(eligible.len());

    for pair in &eligible {
        let subject = Some(pair.display_symbol.as_str());
        let mut scale =
            |field: &str, value: &dyn DecimalSource| -> alloy::primitives::U256 {
                log.scale(Domain::DexPair, subject, field, value, DEFAULT_DECIMALS)
            };

        let record = DexPairRecord {
            primary_token_price: scale(
                "primaryTokenPrice",
                &primary_token_price(pair, prices, denomination),
            ),
            volume_24h: scale("volume24H", &pair.volume.as_ref().map(|v| v.h24)),
            total_liquidity: scale("totalLiquidity", &pair.total_liquidity.usd),
            apr: scale("APR", &pair.apr.as_ref().map(|a| a.total)),
            first_token_balance: scale("firstTokenBalance", &pair.token_a.reserve),
            second_token_balance: scale("secondTokenBalance", &pair.token_b.reserve),
            rewards: scale("rewards", &pair.apr.as_ref().map(|a| a.reward)),
            commissions: scale("commissions", &pair.commission),
            decimals: DEFAULT_DECIMALS,
        };

        symbols.push(pair.display_symbol.clone());
        records.push(record);
    }

    let aggregate = DexAggregateRecord {
        total_value_locked: log.scale(
            Domain::DexAggregate,
            None,
            "totalValueLocked",
            stats.tvl.dex,
            DEFAULT_DECIMALS,
        ),
        total_24h_volume: log.scale(
            Domain::DexAggregate,
            None,
            "total24HVolume",
            total_24h_volume(&eligible),
            DEFAULT_DECIMALS,
        ),
        decimals: DEFAULT_DECIMALS,
    };

    DexRecordSet {
        symbols,
        pairs: records,
        aggregate,
    }
}
