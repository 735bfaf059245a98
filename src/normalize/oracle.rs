//! Oracle price feeds.

use super::records::{Domain, OracleRecord, OracleRecordSet};
use super::WarningLog;
use crate::fixed_point::DEFAULT_DECIMALS;
use crate::ocean::models::PriceTicker;
use std::collections::HashSet;

pub const TICKER_CRYPTO: &str = "CRYPTO";
pub const TICKER_STOCK: &str = "STOCK";

/// Tokens priced as crypto assets; every other feed is a stock ticker.
const CRYPTO_TOKENS: &[&str] = &[
    "BTC", "ETH", "DFI", "USDT", "USDC", "DOGE", "LTC", "BCH", "SOL", "MATIC", "DOT", "EUROC",
    "XCHF", "DUSD",
];

pub fn ticker_type(token: &str) -> &'static str {
    if CRYPTO_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
        TICKER_CRYPTO
    } else {
        TICKER_STOCK
    }
}

/// Records keyed by ticker id, deduplicated (first occurrence wins).
pub fn normalize_oracle(tickers: &[PriceTicker], log: &mut WarningLog) -> OracleRecordSet {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut symbols = Vec::new();
    let mut records = Vec::new();

    for ticker in tickers {
        if !seen.insert(ticker.id.as_str()) {
            continue;
        }
        let subject = Some(ticker.id.as_str());
        let aggregated = &ticker.price.aggregated;

        records.push(OracleRecord {
            price: log.scale(
                Domain::Oracle,
                subject,
                "price",
                &aggregated.amount,
                DEFAULT_DECIMALS,
            ),
            ticker_type: ticker_type(&ticker.price.token).to_string(),
            // counts share the price scale on-chain
            oracles_active: log.scale(
                Domain::Oracle,
                subject,
                "oraclesActive",
                aggregated.oracles.active,
                DEFAULT_DECIMALS,
            ),
            oracles_total: log.scale(
                Domain::Oracle,
                subject,
                "oraclesTotal",
                aggregated.oracles.total,
                DEFAULT_DECIMALS,
            ),
            decimals: DEFAULT_DECIMALS,
        });
        symbols.push(ticker.id.clone());
    }

    OracleRecordSet { symbols, records }
}
