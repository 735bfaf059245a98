//! Ocean API response models
//!
//! Only the fields the relayer consumes are modelled. Every numeric field the
//! API may omit is an `Option`; the normalizer decides what a missing value
//! means (usually the sentinel).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope used by every Ocean endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub page: Option<ApiPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPage {
    pub next: Option<String>,
}

// =============================================================================
// /stats
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsData {
    #[serde(default)]
    pub tvl: TvlStats,
    #[serde(default)]
    pub masternodes: MasternodeStats,
    #[serde(default)]
    pub loan: LoanStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TvlStats {
    pub total: Option<f64>,
    pub dex: Option<f64>,
    pub loan: Option<f64>,
    pub masternodes: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasternodeStats {
    #[serde(default)]
    pub locked: Vec<MasternodeLockBucket>,
}

/// One lock-duration bucket; `weeks` is 0, 260 (5y) or 520 (10y).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasternodeLockBucket {
    pub weeks: u32,
    pub count: Option<f64>,
    pub tvl: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanStats {
    #[serde(default)]
    pub count: LoanCount,
    #[serde(default)]
    pub value: LoanValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanCount {
    pub collateral_tokens: Option<f64>,
    pub loan_tokens: Option<f64>,
    pub open_auctions: Option<f64>,
    pub open_vaults: Option<f64>,
    pub schemes: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanValue {
    pub collateral: Option<f64>,
    pub loan: Option<f64>,
}

// =============================================================================
// /poolpairs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPairData {
    pub id: String,
    pub symbol: String,
    pub display_symbol: String,
    pub token_a: PoolPairToken,
    pub token_b: PoolPairToken,
    pub price_ratio: PriceRatio,
    pub commission: String,
    pub total_liquidity: TotalLiquidity,
    #[serde(default)]
    pub apr: Option<PoolPairApr>,
    #[serde(default)]
    pub volume: Option<PoolPairVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPairToken {
    pub id: String,
    pub symbol: String,
    pub display_symbol: String,
    pub reserve: String,
}

/// `ab` is tokenA per tokenB, `ba` is tokenB per tokenA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRatio {
    pub ab: String,
    pub ba: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalLiquidity {
    pub token: String,
    #[serde(default)]
    pub usd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPairApr {
    pub total: f64,
    pub reward: f64,
    #[serde(default)]
    pub commission: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPairVolume {
    pub h24: f64,
    #[serde(default)]
    pub d30: Option<f64>,
}

// =============================================================================
// /poolpairs/dexprices
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPricesResult {
    #[serde(default)]
    pub dex_prices: HashMap<String, DexPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPrice {
    pub denomination_price: String,
}

// =============================================================================
// /prices
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTicker {
    /// Ticker id, e.g. `BTC-USD`.
    pub id: String,
    pub price: PriceFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeed {
    pub token: String,
    pub currency: String,
    pub aggregated: AggregatedPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub amount: String,
    pub oracles: OracleCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleCounts {
    pub active: f64,
    pub total: f64,
}

// =============================================================================
// /stats/burn
// =============================================================================

/// Burn ledger. Token lists use the compact `"amount@SYMBOL"` encoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurnData {
    pub address: String,
    pub amount: Option<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
    pub feeburn: Option<f64>,
    pub emissionburn: Option<f64>,
    pub auctionburn: Option<f64>,
    pub paybackburn: Option<f64>,
    #[serde(default)]
    pub paybackburntokens: Vec<String>,
    #[serde(default)]
    pub dexfeetokens: Vec<String>,
    pub dfipaybackfee: Option<f64>,
    #[serde(default)]
    pub dfipaybacktokens: Vec<String>,
    #[serde(default)]
    pub paybackfees: Vec<String>,
    #[serde(default)]
    pub paybacktokens: Vec<String>,
    #[serde(default)]
    pub dfip2203: Vec<String>,
    #[serde(default)]
    pub dfip2206f: Vec<String>,
}

/// Everything fetched for one relay cycle. Immutable once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpstreamSnapshot {
    pub stats: StatsData,
    pub pool_pairs: Vec<PoolPairData>,
    pub dex_prices: DexPricesResult,
    pub burn: BurnData,
    pub price_tickers: Vec<PriceTicker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_pair_deserializes_with_optional_sections_missing() {
        let raw = r#"{
            "id": "4",
            "symbol": "ETH-DFI",
            "displaySymbol": "dETH-DFI",
            "name": "Ether-Default Defi token",
            "status": true,
            "tokenA": {"id": "1", "symbol": "ETH", "displaySymbol": "dETH", "reserve": "1000.5"},
            "tokenB": {"id": "0", "symbol": "DFI", "displaySymbol": "DFI", "reserve": "2500.25"},
            "priceRatio": {"ab": "0.4", "ba": "2.5"},
            "commission": "0.002",
            "totalLiquidity": {"token": "1500"}
        }"#;
        let pair: PoolPairData = serde_json::from_str(raw).unwrap();
        assert_eq!(pair.display_symbol, "dETH-DFI");
        assert_eq!(pair.token_b.symbol, "DFI");
        assert!(pair.apr.is_none());
        assert!(pair.volume.is_none());
        assert!(pair.total_liquidity.usd.is_none());
    }

    #[test]
    fn stats_envelope_deserializes() {
        let raw = r#"{"data": {
            "tvl": {"total": 10.5, "dex": 7.25, "loan": 1, "masternodes": 2.25},
            "masternodes": {"locked": [{"weeks": 0, "count": 3, "tvl": 1.5}]},
            "loan": {"count": {"openVaults": 12, "openAuctions": 1},
                     "value": {"collateral": 500, "loan": 0}}
        }}"#;
        let resp: ApiResponse<StatsData> = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.data.tvl.dex, Some(7.25));
        assert_eq!(resp.data.masternodes.locked[0].count, Some(3.0));
        assert_eq!(resp.data.loan.count.open_vaults, Some(12.0));
        assert!(resp.page.is_none());
    }
}
