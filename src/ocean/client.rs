//! Ocean REST API Client
//!
//! Read-only access to the DeFiChain Ocean (whale) API. List endpoints are
//! cursor-paged and are always drained completely before the snapshot is
//! handed to the normalizer; a cycle never works on a partial pool list.

use super::models::{
    ApiResponse, BurnData, DexPricesResult, PoolPairData, PriceTicker, StatsData, UpstreamSnapshot,
};
use super::OceanNetwork;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Hard stop for cursor pagination.
const MAX_PAGES: usize = 200;

#[derive(Debug, Clone)]
pub struct OceanClientConfig {
    pub base_url: String,
    pub network: OceanNetwork,
    pub page_size: u32,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct OceanClient {
    client: Client,
    base_url: String,
    network: OceanNetwork,
    page_size: u32,
}

impl OceanClient {
    pub fn new(config: OceanClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to build OceanClient")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            network: config.network,
            page_size: config.page_size.max(1),
        })
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}/v0/{}{}", self.base_url, self.network.as_str(), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<T>> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("GET {} {}: {}", path, status, text));
        }

        resp.json::<ApiResponse<T>>()
            .await
            .with_context(|| format!("Failed to parse {} response", path))
    }

    /// Follow `page.next` until the API stops returning a cursor.
    async fn drain_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(String, String)],
    ) -> Result<Vec<T>> {
        drain_cursor(path, MAX_PAGES, |cursor| {
            let mut qp: Vec<(String, String)> = Vec::with_capacity(extra.len() + 2);
            qp.extend_from_slice(extra);
            qp.push(("size".to_string(), self.page_size.to_string()));
            if let Some(cursor) = cursor {
                qp.push(("next".to_string(), cursor));
            }
            async move {
                let resp = self.get_json::<Vec<T>>(path, &qp).await?;
                Ok((resp.data, resp.page.and_then(|p| p.next)))
            }
        })
        .await
    }

    pub async fn get_stats(&self) -> Result<StatsData> {
        Ok(self.get_json::<StatsData>("/stats", &[]).await?.data)
    }

    pub async fn get_burn(&self) -> Result<BurnData> {
        Ok(self.get_json::<BurnData>("/stats/burn", &[]).await?.data)
    }

    pub async fn list_pool_pairs(&self) -> Result<Vec<PoolPairData>> {
        self.drain_pages("/poolpairs", &[]).await
    }

    pub async fn list_dex_prices(&self, denomination: &str) -> Result<DexPricesResult> {
        let qp = [("denomination".to_string(), denomination.to_string())];
        Ok(self
            .get_json::<DexPricesResult>("/poolpairs/dexprices", &qp)
            .await?
            .data)
    }

    pub async fn list_prices(&self) -> Result<Vec<PriceTicker>> {
        self.drain_pages("/prices", &[]).await
    }

    /// Fetch everything one cycle needs. Any failure aborts the whole fetch.
    pub async fn fetch_snapshot(
        &self,
        denomination: &str,
        include_prices: bool,
    ) -> Result<UpstreamSnapshot> {
        let (stats, pool_pairs, dex_prices, burn) = tokio::try_join!(
            self.get_stats(),
            self.list_pool_pairs(),
            self.list_dex_prices(denomination),
            self.get_burn(),
        )?;

        let price_tickers = if include_prices {
            self.list_prices().await?
        } else {
            Vec::new()
        };

        info!(
            network = self.network.as_str(),
            pool_pairs = pool_pairs.len(),
            dex_prices = dex_prices.dex_prices.len(),
            price_tickers = price_tickers.len(),
            "📥 Upstream snapshot fetched"
        );

        Ok(UpstreamSnapshot {
            stats,
            pool_pairs,
            dex_prices,
            burn,
            price_tickers,
        })
    }
}

/// Cursor loop shared by the paged endpoints. `fetch` gets the cursor from
/// the previous page (`None` first) and returns one page plus the next
/// cursor. An empty cursor ends the walk like a missing one.
async fn drain_cursor<T, F, Fut>(path: &str, max_pages: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut next: Option<String> = None;

    for page in 0..max_pages {
        let (data, cursor) = fetch(next.take()).await?;
        debug!(path, page, count = data.len(), "Fetched page");
        items.extend(data);

        next = cursor.filter(|c| !c.is_empty());
        if next.is_none() {
            return Ok(items);
        }
    }

    Err(anyhow::anyhow!(
        "GET {} did not finish within {} pages",
        path,
        max_pages
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn follows_cursor_to_the_last_page() {
        let seen: Mutex<Vec<Option<String>>> = Mutex::new(Vec::new());
        let items = drain_cursor("/poolpairs", 10, |cursor| {
            seen.lock().unwrap().push(cursor.clone());
            async move {
                Ok(match cursor.as_deref() {
                    None => (vec![1, 2], Some("2".to_string())),
                    Some("2") => (vec![3, 4], Some("4".to_string())),
                    _ => (vec![5], None),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("2".to_string()), Some("4".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_cursor_ends_pagination() {
        let items = drain_cursor("/prices", 10, |_| async {
            Ok((vec!["BTC-USD"], Some(String::new())))
        })
        .await
        .unwrap();
        assert_eq!(items, vec!["BTC-USD"]);
    }

    #[tokio::test]
    async fn endless_cursor_stops_at_page_limit() {
        let calls = Mutex::new(0usize);
        let err = drain_cursor::<u32, _, _>("/poolpairs", 3, |_| {
            *calls.lock().unwrap() += 1;
            async { Ok((vec![7], Some("again".to_string()))) }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 3);
        assert!(err.to_string().contains("did not finish within 3 pages"));
    }

    #[tokio::test]
    async fn page_error_aborts_the_walk() {
        let result = drain_cursor::<u32, _, _>("/poolpairs", 5, |cursor| async move {
            match cursor {
                None => Ok((vec![1], Some("1".to_string()))),
                Some(_) => Err(anyhow::anyhow!("GET /poolpairs 502 Bad Gateway")),
            }
        })
        .await;
        assert!(result.is_err());
    }
}
