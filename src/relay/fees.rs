//! Fee selection and the per-cycle signing context.

use super::rpc::{ChainTransport, FeeData};
use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

pub const GWEI: u128 = 1_000_000_000;

/// Default minimum priority fee for dynamic mode.
pub const DEFAULT_PRIORITY_FLOOR: u128 = GWEI;

/// How fees are chosen for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// Fixed gas price, legacy transactions.
    Static { gas_price: u128 },
    /// Derived from current network fee data, with a priority floor.
    Dynamic { priority_floor: u128 },
}

impl Default for FeeMode {
    fn default() -> Self {
        Self::Dynamic {
            priority_floor: DEFAULT_PRIORITY_FLOOR,
        }
    }
}

/// Fee parameters applied to every operation of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeParams {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl FeeParams {
    /// Upper bound paid per unit of gas.
    pub fn max_price(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// `maxFee = 2 × baseFee + priority`, `priority = max(suggested, floor)`.
/// Chains without a base fee get a floored legacy gas price.
pub fn resolve_fees(mode: FeeMode, data: &FeeData) -> FeeParams {
    match mode {
        FeeMode::Static { gas_price } => FeeParams::Legacy { gas_price },
        FeeMode::Dynamic { priority_floor } => match data.base_fee_per_gas {
            Some(base_fee) => {
                let priority = data
                    .max_priority_fee_per_gas
                    .unwrap_or(0)
                    .max(priority_floor);
                FeeParams::Eip1559 {
                    max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
                    max_priority_fee_per_gas: priority,
                }
            }
            None => FeeParams::Legacy {
                gas_price: data.gas_price.max(priority_floor),
            },
        },
    }
}

/// Signer state for one cycle, read once before planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    pub signer: Address,
    pub chain_id: u64,
    pub base_nonce: u64,
    pub fees: FeeParams,
}

impl SigningContext {
    pub async fn fetch(
        transport: &dyn ChainTransport,
        signer: Address,
        mode: FeeMode,
    ) -> Result<Self> {
        let chain_id = transport.chain_id().await.context("chain id lookup failed")?;
        let base_nonce = transport
            .pending_nonce(signer)
            .await
            .context("nonce lookup failed")?;
        let fees = match mode {
            FeeMode::Static { .. } => resolve_fees(mode, &FeeData::default()),
            FeeMode::Dynamic { .. } => {
                let data = transport.fee_data().await.context("fee lookup failed")?;
                resolve_fees(mode, &data)
            }
        };

        info!(
            signer = %signer,
            chain_id,
            base_nonce,
            max_gas_price = fees.max_price(),
            "🔑 Signing context ready"
        );

        Ok(Self {
            signer,
            chain_id,
            base_nonce,
            fees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_mode_ignores_network() {
        let data = FeeData {
            gas_price: 99,
            base_fee_per_gas: Some(50),
            max_priority_fee_per_gas: Some(3),
        };
        assert_eq!(
            resolve_fees(FeeMode::Static { gas_price: 7 }, &data),
            FeeParams::Legacy { gas_price: 7 }
        );
    }

    #[test]
    fn dynamic_mode_applies_priority_floor() {
        let data = FeeData {
            gas_price: 0,
            base_fee_per_gas: Some(10 * GWEI),
            max_priority_fee_per_gas: Some(GWEI / 10),
        };
        let fees = resolve_fees(
            FeeMode::Dynamic {
                priority_floor: GWEI,
            },
            &data,
        );
        assert_eq!(
            fees,
            FeeParams::Eip1559 {
                max_fee_per_gas: 21 * GWEI,
                max_priority_fee_per_gas: GWEI,
            }
        );
    }

    #[test]
    fn dynamic_mode_keeps_higher_suggested_priority() {
        let data = FeeData {
            gas_price: 0,
            base_fee_per_gas: Some(GWEI),
            max_priority_fee_per_gas: Some(3 * GWEI),
        };
        let fees = resolve_fees(FeeMode::default(), &data);
        assert_eq!(fees.max_price(), 5 * GWEI);
    }

    #[test]
    fn dynamic_mode_without_base_fee_falls_back_to_legacy() {
        let data = FeeData {
            gas_price: GWEI / 2,
            base_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        };
        assert_eq!(
            resolve_fees(FeeMode::default(), &data),
            FeeParams::Legacy { gas_price: GWEI }
        );
    }
}
