//! State Relayer
//!
//! Runs one relay cycle: Ocean stats → StateRelayer contract.
//!
//! Usage:
//!   state-relayer --rpc-url http://127.0.0.1:8545 --contract-address 0x.. --slots dex,vault
//!   state-relayer --paper --dry-run
//!
//! Exit codes:
//!   0 - every operation confirmed (or planned, in dry-run)
//!   1 - cycle ran but at least one operation failed
//!   2 - invalid configuration, nothing fetched
//!   3 - cycle failed before anything was broadcast

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use state_relayer::config::RelayerConfig;
use state_relayer::cycle::{RelayCycle, StatsSource};
use state_relayer::ocean::{OceanClient, OceanNetwork, DEFAULT_OCEAN_URL};
use state_relayer::relay::fees::{DEFAULT_PRIORITY_FLOOR, GWEI};
use state_relayer::relay::{
    ChainTransport, FeeMode, GasLimits, JsonRpcTransport, PaperChain, RelayExecutor,
    SchemaVersion, Slot, SubmissionMode,
};

#[derive(Parser, Debug)]
#[command(name = "state-relayer")]
#[command(about = "Publish DeFiChain statistics to the StateRelayer contract")]
struct Args {
    /// Ocean API base URL
    #[arg(long, env = "OCEAN_URL", default_value = DEFAULT_OCEAN_URL)]
    ocean_url: String,

    /// Ocean network segment (mainnet, testnet, changi, devnet, regtest)
    #[arg(long, env = "OCEAN_NETWORK", default_value = "mainnet")]
    network: OceanNetwork,

    /// Page size for paginated Ocean endpoints
    #[arg(long, env = "PAGE_SIZE", default_value = "200")]
    page_size: u32,

    /// HTTP timeout in seconds (Ocean and RPC)
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    http_timeout_secs: u64,

    /// EVM JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", default_value = "")]
    rpc_url: String,

    /// StateRelayer proxy address
    #[arg(long, env = "CONTRACT_ADDRESS", default_value = "")]
    contract_address: String,

    /// Bot key (hex)
    #[arg(long, env = "PRIVATE_KEY", default_value = "", hide_env_values = true)]
    private_key: String,

    /// Contract schema (v1, v2)
    #[arg(long, env = "SCHEMA_VERSION", default_value = "v2")]
    schema_version: SchemaVersion,

    /// Slots to publish (comma-separated)
    #[arg(long, env = "SLOTS", default_value = "dex,master_node,vault,burn")]
    slots: String,

    /// Publish every slot in one batchCallByBot transaction
    #[arg(long, env = "BATCH")]
    batch: bool,

    /// Quote token for DEX prices
    #[arg(long, env = "DENOMINATION", default_value = "USDT")]
    denomination: String,

    /// Fixed gas price in wei; switches to legacy transactions
    #[arg(long, env = "GAS_PRICE_WEI")]
    gas_price_wei: Option<u128>,

    /// Minimum priority fee in wei for dynamic fees
    #[arg(long, env = "PRIORITY_FLOOR_WEI", default_value_t = DEFAULT_PRIORITY_FLOOR)]
    priority_floor_wei: u128,

    #[arg(long, env = "GAS_LIMIT_DEX")]
    gas_limit_dex: Option<u64>,

    #[arg(long, env = "GAS_LIMIT_MASTER_NODE")]
    gas_limit_master_node: Option<u64>,

    #[arg(long, env = "GAS_LIMIT_VAULT")]
    gas_limit_vault: Option<u64>,

    #[arg(long, env = "GAS_LIMIT_BURN")]
    gas_limit_burn: Option<u64>,

    #[arg(long, env = "GAS_LIMIT_ORACLE")]
    gas_limit_oracle: Option<u64>,

    /// Gas limit for the batch transaction (default: sum of slot limits)
    #[arg(long, env = "GAS_LIMIT_BATCH")]
    gas_limit_batch: Option<u64>,

    /// Pre-flight every transaction with eth_call
    #[arg(long, env = "SIMULATE", default_value_t = true, action = clap::ArgAction::Set)]
    simulate: bool,

    /// Wait for receipts before reporting
    #[arg(long, env = "AWAIT_CONFIRMATIONS", default_value_t = true, action = clap::ArgAction::Set)]
    await_confirmations: bool,

    /// Receipt wait limit in seconds
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "120")]
    confirmation_timeout_secs: u64,

    /// Receipt poll interval in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "2000")]
    poll_interval_ms: u64,

    /// Plan and report without signing or sending
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Publish to an in-memory chain instead of RPC_URL
    #[arg(long, env = "PAPER")]
    paper: bool,

    /// Chain id reported by the in-memory chain
    #[arg(long, env = "PAPER_CHAIN_ID", default_value = "1131")]
    paper_chain_id: u64,
}

impl Args {
    fn into_config(self) -> Result<RelayerConfig, String> {
        let slots = parse_slots(&self.slots)?;
        let defaults = GasLimits::default();
        let fee_mode = match self.gas_price_wei {
            Some(gas_price) => FeeMode::Static { gas_price },
            None => FeeMode::Dynamic {
                priority_floor: self.priority_floor_wei,
            },
        };

        Ok(RelayerConfig {
            ocean_url: self.ocean_url,
            network: self.network,
            page_size: self.page_size,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            rpc_url: self.rpc_url,
            contract_address: self.contract_address,
            private_key: self.private_key,
            schema_version: self.schema_version,
            slots,
            submission_mode: if self.batch {
                SubmissionMode::Batched
            } else {
                SubmissionMode::Independent
            },
            denomination: self.denomination,
            fee_mode,
            gas: GasLimits {
                dex: self.gas_limit_dex.unwrap_or(defaults.dex),
                master_node: self.gas_limit_master_node.unwrap_or(defaults.master_node),
                vault: self.gas_limit_vault.unwrap_or(defaults.vault),
                burn: self.gas_limit_burn.unwrap_or(defaults.burn),
                oracle: self.gas_limit_oracle.unwrap_or(defaults.oracle),
                batch: self.gas_limit_batch,
            },
            simulate: self.simulate,
            await_confirmations: self.await_confirmations,
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            dry_run: self.dry_run,
            paper: self.paper,
        })
    }
}

/// Comma-separated slot names, publication order, no duplicates.
fn parse_slots(raw: &str) -> Result<Vec<Slot>, String> {
    let mut slots = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Slot>)
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort();
    slots.dedup();
    Ok(slots)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("state_relayer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let paper_chain_id = args.paper_chain_id;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Relayer configuration INVALID:\n  - [slots] {}", e);
            return ExitCode::from(2);
        }
    };
    if let Err(e) = config.ensure_valid() {
        eprintln!("{}", e);
        return ExitCode::from(2);
    }

    info!("Starting State Relayer");
    info!("  Ocean: {} ({})", config.ocean_url, config.network);
    info!("  Schema: {}", config.schema_version);
    info!("  Slots: {:?}", config.slots);
    info!("  Mode: {:?}", config.submission_mode);
    if let FeeMode::Static { gas_price } = config.fee_mode {
        info!("  Gas price: {} gwei (static)", gas_price / GWEI);
    }
    if config.paper {
        info!("  Target: in-memory chain {}", paper_chain_id);
    } else {
        info!("  Target: {}", config.rpc_url);
    }

    let cycle = match build_cycle(&config, paper_chain_id) {
        Ok(cycle) => cycle,
        Err(e) => {
            error!("❌ Startup failed: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let report = cycle.run().await;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to render cycle report: {}", e),
    }

    ExitCode::from(report.exit_code() as u8)
}

fn build_cycle(config: &RelayerConfig, paper_chain_id: u64) -> Result<RelayCycle> {
    // validated above; these only fail if validation was skipped
    let contract = config.contract().map_err(anyhow::Error::msg)?;
    let signer = config.signer().map_err(anyhow::Error::msg)?;

    let source: Arc<dyn StatsSource> = Arc::new(
        OceanClient::new(config.ocean_config()).context("Failed to build Ocean client")?,
    );

    let transport: Arc<dyn ChainTransport> = if config.paper {
        Arc::new(PaperChain::new(
            config.schema_version,
            paper_chain_id,
            contract,
            signer.address(),
        ))
    } else {
        Arc::new(
            JsonRpcTransport::new(config.rpc_url.clone(), config.http_timeout)
                .context("Failed to build RPC transport")?,
        )
    };

    let executor = RelayExecutor::new(transport, signer, config.executor_config());
    Ok(RelayCycle::new(
        source,
        executor,
        config.planner(contract),
        config.normalize_options(),
        config.fee_mode,
    )
    .dry_run(config.dry_run))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_sorted_and_deduplicated() {
        let slots = parse_slots("vault, dex,mn,dex").unwrap();
        assert_eq!(slots, vec![Slot::Dex, Slot::MasterNode, Slot::Vault]);
    }

    #[test]
    fn unknown_slot_is_rejected() {
        assert!(parse_slots("dex,prices").is_err());
    }

    #[test]
    fn gas_price_selects_static_fees() {
        let args = Args::parse_from([
            "state-relayer",
            "--paper",
            "--gas-price-wei",
            "5000000000",
            "--gas-limit-vault",
            "300000",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.fee_mode, FeeMode::Static { gas_price: 5 * GWEI });
        assert_eq!(config.gas.vault, 300_000);
        assert_eq!(config.gas.dex, GasLimits::default().dex);
    }
}
