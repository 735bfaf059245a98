//! Relayer configuration
//!
//! Every input is supplied externally (CLI flags or environment, see
//! `main.rs`). [`RelayerConfig::validate`] reports every problem at once
//! before anything touches the network.

use crate::error::ConfigError;
use crate::normalize::NormalizeOptions;
use crate::ocean::{OceanClientConfig, OceanNetwork};
use crate::relay::executor::ExecutorConfig;
use crate::relay::{FeeMode, GasLimits, SchemaVersion, Slot, SubmissionMode, UpdatePlanner};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Largest page the Ocean API serves.
pub const MAX_PAGE_SIZE: u32 = 200;

// =============================================================================
// VIOLATIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigViolation {
    /// Field that is misconfigured or missing.
    pub field: String,
    pub description: String,
    pub suggestion: String,
}

impl ConfigViolation {
    fn new(field: &str, description: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            description: description.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.field, self.description, self.suggestion)
    }
}

pub fn format_report(violations: &[ConfigViolation]) -> String {
    if violations.is_empty() {
        return "Relayer configuration VALID".to_string();
    }
    let mut out = String::from("Relayer configuration INVALID:\n");
    for v in violations {
        out.push_str(&format!("  - {}\n", v));
    }
    out
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone)]
pub struct RelayerConfig {
    pub ocean_url: String,
    pub network: OceanNetwork,
    pub page_size: u32,
    pub http_timeout: Duration,

    pub rpc_url: String,
    pub contract_address: String,
    pub private_key: String,

    pub schema_version: SchemaVersion,
    pub slots: Vec<Slot>,
    pub submission_mode: SubmissionMode,
    pub denomination: String,
    pub fee_mode: FeeMode,
    pub gas: GasLimits,

    pub simulate: bool,
    pub await_confirmations: bool,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,

    pub dry_run: bool,
    /// Publish to an in-memory chain instead of `rpc_url`.
    pub paper: bool,
}

impl fmt::Debug for RelayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerConfig")
            .field("ocean_url", &self.ocean_url)
            .field("network", &self.network)
            .field("page_size", &self.page_size)
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &"[REDACTED]")
            .field("schema_version", &self.schema_version)
            .field("slots", &self.slots)
            .field("submission_mode", &self.submission_mode)
            .field("denomination", &self.denomination)
            .field("fee_mode", &self.fee_mode)
            .field("gas", &self.gas)
            .field("simulate", &self.simulate)
            .field("await_confirmations", &self.await_confirmations)
            .field("dry_run", &self.dry_run)
            .field("paper", &self.paper)
            .finish()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl RelayerConfig {
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut violations = Vec::new();

        if !is_http_url(&self.ocean_url) {
            violations.push(ConfigViolation::new(
                "ocean_url",
                format!("{:?} is not an http(s) URL", self.ocean_url),
                "Set OCEAN_URL, e.g. https://ocean.defichain.com",
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            violations.push(ConfigViolation::new(
                "page_size",
                format!("page size {} out of range", self.page_size),
                format!("Use a page size between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if self.denomination.trim().is_empty() {
            violations.push(ConfigViolation::new(
                "denomination",
                "denomination symbol is empty",
                "Set DENOMINATION to the quote token symbol (e.g. 'USDT')",
            ));
        }

        if !self.paper && !is_http_url(&self.rpc_url) {
            violations.push(ConfigViolation::new(
                "rpc_url",
                "RPC endpoint missing or not an http(s) URL",
                "Set RPC_URL, or pass --paper to publish to an in-memory chain",
            ));
        }
        if let Err(e) = self.contract() {
            violations.push(ConfigViolation::new(
                "contract_address",
                e,
                "Address should be 42 characters starting with 0x",
            ));
        }
        if let Err(e) = self.signer() {
            violations.push(ConfigViolation::new(
                "private_key",
                e,
                "Set PRIVATE_KEY to the bot's 32-byte hex key",
            ));
        }

        if self.slots.is_empty() {
            violations.push(ConfigViolation::new(
                "slots",
                "no slots selected",
                "Select at least one of dex, master_node, vault, burn, oracle",
            ));
        }
        for slot in &self.slots {
            if !slot.supported_by(self.schema_version) {
                violations.push(ConfigViolation::new(
                    "slots",
                    format!("slot {} does not exist in schema {}", slot, self.schema_version),
                    "Remove the slot or target the v2 contract",
                ));
            }
        }

        for slot in Slot::ALL {
            if self.slots.contains(&slot) && self.gas.for_slot(slot) == 0 {
                violations.push(ConfigViolation::new(
                    "gas",
                    format!("gas limit for {} is zero", slot),
                    "Leave the default or set a positive limit",
                ));
            }
        }
        if self.gas.batch == Some(0) {
            violations.push(ConfigViolation::new(
                "gas.batch",
                "batch gas limit is zero",
                "Unset it to use the sum of slot limits",
            ));
        }
        if let FeeMode::Static { gas_price: 0 } = self.fee_mode {
            violations.push(ConfigViolation::new(
                "gas_price",
                "static gas price is zero",
                "Set GAS_PRICE_WEI or use dynamic fees",
            ));
        }
        if self.await_confirmations && self.confirmation_timeout.is_zero() {
            violations.push(ConfigViolation::new(
                "confirmation_timeout",
                "confirmation timeout is zero",
                "Set a timeout or disable --await-confirmations",
            ));
        }

        violations
    }

    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(violations))
        }
    }

    pub fn contract(&self) -> Result<Address, String> {
        self.contract_address
            .trim()
            .parse::<Address>()
            .map_err(|e| format!("invalid contract address: {}", e))
    }

    pub fn signer(&self) -> Result<PrivateKeySigner, String> {
        let key = self.private_key.trim();
        if key.is_empty() {
            return Err("private key is missing".to_string());
        }
        // never echo the key itself
        key.parse::<PrivateKeySigner>()
            .map_err(|_| "private key is not a valid secp256k1 key".to_string())
    }

    pub fn ocean_config(&self) -> OceanClientConfig {
        OceanClientConfig {
            base_url: self.ocean_url.clone(),
            network: self.network,
            page_size: self.page_size,
            timeout: self.http_timeout,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            denomination: self.denomination.trim().to_string(),
            include_oracle: self.slots.contains(&Slot::Oracle),
        }
    }

    pub fn planner(&self, target: Address) -> UpdatePlanner {
        UpdatePlanner {
            version: self.schema_version,
            mode: self.submission_mode,
            target,
            slots: self.slots.clone(),
            gas: self.gas,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            simulate: self.simulate,
            await_confirmations: self.await_confirmations,
            confirmation_timeout: self.confirmation_timeout,
            poll_interval: self.poll_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocean::DEFAULT_OCEAN_URL;

    // well-known development key, never funded on a real network
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config() -> RelayerConfig {
        RelayerConfig {
            ocean_url: DEFAULT_OCEAN_URL.to_string(),
            network: OceanNetwork::MainNet,
            page_size: 200,
            http_timeout: Duration::from_secs(30),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: "0x0000000000000000000000000000000000000b0b".to_string(),
            private_key: DEV_KEY.to_string(),
            schema_version: SchemaVersion::V2,
            slots: Slot::ALL.to_vec(),
            submission_mode: SubmissionMode::Independent,
            denomination: "USDT".to_string(),
            fee_mode: FeeMode::default(),
            gas: GasLimits::default(),
            simulate: true,
            await_confirmations: true,
            confirmation_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            dry_run: false,
            paper: false,
        }
    }

    #[test]
    fn valid_config_has_no_violations() {
        let violations = config().validate();
        assert!(violations.is_empty(), "{}", format_report(&violations));
    }

    #[test]
    fn reports_every_violation_at_once() {
        let mut cfg = config();
        cfg.rpc_url = String::new();
        cfg.contract_address = "0x1234".to_string();
        cfg.private_key = String::new();
        cfg.page_size = 500;
        cfg.schema_version = SchemaVersion::V1;

        let fields: Vec<String> = cfg.validate().into_iter().map(|v| v.field).collect();
        for expected in ["rpc_url", "contract_address", "private_key", "page_size", "slots"] {
            assert!(fields.iter().any(|f| f == expected), "missing {}", expected);
        }
    }

    #[test]
    fn paper_mode_does_not_need_rpc() {
        let mut cfg = config();
        cfg.rpc_url = String::new();
        cfg.paper = true;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn debug_output_redacts_key() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("ac0974bec39a17e3"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn oracle_slot_drives_oracle_fetch() {
        let mut cfg = config();
        assert!(cfg.normalize_options().include_oracle);
        cfg.slots.retain(|s| *s != Slot::Oracle);
        assert!(!cfg.normalize_options().include_oracle);
    }
}
