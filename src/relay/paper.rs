//! Paper chain
//!
//! In-memory [`ChainTransport`] that hosts a StateRelayer contract. It decodes
//! real signed transactions, enforces the bot role, checks array lengths and
//! runs batches atomically. Every update overwrites its slot, so publishing
//! the same records twice leaves identical state.
//!
//! Transactions are mined instantly: a successful `eth_sendRawTransaction`
//! already has a receipt.

use super::contract::{IStateRelayer, IStateRelayerV2, RevertReason, SchemaVersion};
use super::rpc::{CallOutcome, CallRequest, ChainTransport, FeeData, SendOutcome, TxReceipt};
use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Base cost charged per transaction, plus 16 gas per calldata byte.
const BASE_GAS: u64 = 21_000;

/// Contract storage as last written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperState {
    /// Per-pair DEX info as ABI words.
    pub dex: BTreeMap<String, Vec<U256>>,
    pub total_value_locked: U256,
    pub total_24h_volume: U256,
    pub master_node: Vec<U256>,
    pub vault: Vec<U256>,
    /// ABI-encoded `BurnInfo`.
    pub burn: Option<Bytes>,
    /// ABI-encoded `OracleInfo` per ticker.
    pub oracle: BTreeMap<String, Bytes>,
}

#[derive(Debug, Default)]
struct Ledger {
    state: PaperState,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<B256, TxReceipt>,
    block_number: u64,
    offline: bool,
    withhold_receipts: bool,
}

pub struct PaperChain {
    version: SchemaVersion,
    chain_id: u64,
    contract: Address,
    bot: Address,
    fees: FeeData,
    ledger: Mutex<Ledger>,
}

/// ABI words of a static struct.
fn words<T: SolValue>(value: &T) -> Vec<U256> {
    value
        .abi_encode()
        .chunks(32)
        .map(U256::from_be_slice)
        .collect()
}

fn undecodable() -> RevertReason {
    RevertReason::Unknown(String::new())
}

/// Update calls shared by both schema versions. Evaluates to `None` when the
/// selector is not one of them.
macro_rules! apply_update {
    ($module:ident, $state:expr, $selector:expr, $input:expr) => {{
        let state: &mut PaperState = $state;
        let input: &[u8] = $input;
        if $selector == $module::updateDEXInfoCall::SELECTOR {
            let call = $module::updateDEXInfoCall::abi_decode(input).map_err(|_| undecodable())?;
            if call.dex.len() != call.dexInfo.len() {
                return Err(RevertReason::DexLengthMismatch);
            }
            for (symbol, info) in call.dex.into_iter().zip(call.dexInfo.iter()) {
                state.dex.insert(symbol, words(info));
            }
            state.total_value_locked = call.totalValueLocked;
            state.total_24h_volume = call.total24HVolume;
            Some(())
        } else if $selector == $module::updateMasterNodeInformationCall::SELECTOR {
            let call = $module::updateMasterNodeInformationCall::abi_decode(input)
                .map_err(|_| undecodable())?;
            state.master_node = words(&call.masterNodeInformation);
            Some(())
        } else if $selector == $module::updateVaultGeneralInformationCall::SELECTOR {
            let call = $module::updateVaultGeneralInformationCall::abi_decode(input)
                .map_err(|_| undecodable())?;
            state.vault = words(&call.vaultInformation);
            Some(())
        } else if $selector == $module::updateBurnInfoCall::SELECTOR {
            let call =
                $module::updateBurnInfoCall::abi_decode(input).map_err(|_| undecodable())?;
            state.burn = Some(call.burnInfo.abi_encode().into());
            Some(())
        } else {
            None
        }
    }};
}

impl PaperChain {
    pub fn new(version: SchemaVersion, chain_id: u64, contract: Address, bot: Address) -> Self {
        Self {
            version,
            chain_id,
            contract,
            bot,
            fees: FeeData {
                gas_price: 10_000_000_000,
                base_fee_per_gas: Some(10_000_000_000),
                max_priority_fee_per_gas: Some(1_000_000_000),
            },
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn state(&self) -> PaperState {
        self.ledger.lock().state.clone()
    }

    pub fn block_number(&self) -> u64 {
        self.ledger.lock().block_number
    }

    pub fn nonce_of(&self, address: Address) -> u64 {
        self.ledger.lock().nonces.get(&address).copied().unwrap_or(0)
    }

    /// Make every RPC fail as if the node were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.ledger.lock().offline = offline;
    }

    /// Keep mining but report every receipt as not yet available.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.ledger.lock().withhold_receipts = withhold;
    }

    fn ensure_online(&self) -> Result<()> {
        if self.ledger.lock().offline {
            return Err(anyhow::anyhow!("paper chain offline"));
        }
        Ok(())
    }

    /// Execute `input` from `from` against `state`. `state` is only
    /// meaningful when this returns `Ok`.
    fn apply(
        &self,
        state: &mut PaperState,
        from: Address,
        input: &[u8],
    ) -> std::result::Result<(), RevertReason> {
        if input.len() < 4 {
            return Err(undecodable());
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];

        if selector == IStateRelayerV2::batchCallByBotCall::SELECTOR {
            if from != self.bot {
                return Err(RevertReason::NotBot);
            }
            let call =
                IStateRelayerV2::batchCallByBotCall::abi_decode(input).map_err(|_| undecodable())?;
            let mut working = state.clone();
            for inner in &call.funcCalls {
                self.apply_update(&mut working, inner)
                    .map_err(|_| RevertReason::LowLevelCall)?;
            }
            *state = working;
            return Ok(());
        }

        if from != self.bot {
            return Err(RevertReason::NotBot);
        }
        self.apply_update(state, input)
    }

    fn apply_update(
        &self,
        state: &mut PaperState,
        input: &[u8],
    ) -> std::result::Result<(), RevertReason> {
        if input.len() < 4 {
            return Err(undecodable());
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];

        let applied = match self.version {
            SchemaVersion::V1 => apply_update!(IStateRelayer, state, selector, input),
            SchemaVersion::V2 => {
                if selector == IStateRelayerV2::updateOracleInfoCall::SELECTOR {
                    let call = IStateRelayerV2::updateOracleInfoCall::abi_decode(input)
                        .map_err(|_| undecodable())?;
                    if call.oracle.len() != call.oracleInfo.len() {
                        return Err(RevertReason::OracleLengthMismatch);
                    }
                    for (symbol, info) in call.oracle.into_iter().zip(call.oracleInfo.iter()) {
                        state.oracle.insert(symbol, info.abi_encode().into());
                    }
                    Some(())
                } else {
                    apply_update!(IStateRelayerV2, state, selector, input)
                }
            }
        };
        applied.ok_or_else(undecodable)
    }

    fn gas_for(input: &[u8]) -> u64 {
        BASE_GAS + 16 * input.len() as u64
    }
}

#[async_trait]
impl ChainTransport for PaperChain {
    async fn chain_id(&self) -> Result<u64> {
        self.ensure_online()?;
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        self.ensure_online()?;
        Ok(self.nonce_of(address))
    }

    async fn fee_data(&self) -> Result<FeeData> {
        self.ensure_online()?;
        Ok(self.fees)
    }

    async fn call(&self, request: &CallRequest) -> Result<CallOutcome> {
        self.ensure_online()?;
        if request.to != self.contract {
            return Ok(CallOutcome::Success(Bytes::new()));
        }
        let mut scratch = self.state();
        Ok(match self.apply(&mut scratch, request.from, &request.data) {
            Ok(()) => CallOutcome::Success(Bytes::new()),
            Err(reason) => CallOutcome::Reverted {
                message: "execution reverted".to_string(),
                data: reason.encode(),
            },
        })
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<SendOutcome> {
        self.ensure_online()?;

        let rejected = |message: String| SendOutcome::Rejected {
            message,
            data: Bytes::new(),
        };
        let envelope = match TxEnvelope::decode_2718(&mut &raw[..]) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(rejected(format!("invalid transaction: {}", e))),
        };
        let from = match envelope.recover_signer() {
            Ok(from) => from,
            Err(e) => return Ok(rejected(format!("invalid signature: {}", e))),
        };
        if let Some(chain_id) = envelope.chain_id() {
            if chain_id != self.chain_id {
                return Ok(rejected(format!("invalid chain id {}", chain_id)));
            }
        }

        let mut ledger = self.ledger.lock();
        let expected = ledger.nonces.get(&from).copied().unwrap_or(0);
        if envelope.nonce() < expected {
            return Ok(rejected("nonce too low".to_string()));
        }
        if envelope.nonce() > expected {
            return Ok(rejected(format!(
                "nonce gap: expected {}, got {}",
                expected,
                envelope.nonce()
            )));
        }

        let hash = *envelope.tx_hash();
        let input = envelope.input().clone();
        let success = match envelope.to() {
            Some(to) if to == self.contract => {
                let mut next = ledger.state.clone();
                match self.apply(&mut next, from, &input) {
                    Ok(()) => {
                        ledger.state = next;
                        true
                    }
                    Err(reason) => {
                        debug!(tx_hash = %hash, reason = %reason, "Paper transaction reverted");
                        false
                    }
                }
            }
            _ => true,
        };

        ledger.nonces.insert(from, expected + 1);
        ledger.block_number += 1;
        let receipt = TxReceipt {
            tx_hash: hash,
            success,
            gas_used: Self::gas_for(&input).min(envelope.gas_limit()),
            block_number: Some(ledger.block_number),
        };
        ledger.receipts.insert(hash, receipt);
        Ok(SendOutcome::Accepted(hash))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        self.ensure_online()?;
        let ledger = self.ledger.lock();
        if ledger.withhold_receipts {
            return Ok(None);
        }
        Ok(ledger.receipts.get(&hash).cloned())
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (PaperChain, Address) {
        let bot = Address::repeat_byte(0xb0);
        let chain = PaperChain::new(SchemaVersion::V2, 1133, Address::repeat_byte(0xcc), bot);
        (chain, bot)
    }

    fn vault_call(n: u64) -> Vec<u8> {
        IStateRelayerV2::updateVaultGeneralInformationCall {
            vaultInformation: IStateRelayerV2::VaultGeneralInformation {
                noOfVaultsNoDecimals: U256::from(n),
                totalLoanValue: U256::from(1u64),
                totalCollateralValue: U256::from(2u64),
                totalCollateralizationRatio: U256::from(200u64),
                activeAuctionsNoDecimals: U256::ZERO,
            },
        }
        .abi_encode()
    }

    #[test]
    fn non_bot_caller_is_rejected() {
        let (chain, _) = chain();
        let mut state = PaperState::default();
        let err = chain
            .apply(&mut state, Address::repeat_byte(0x01), &vault_call(1))
            .unwrap_err();
        assert_eq!(err, RevertReason::NotBot);
    }

    #[test]
    fn update_overwrites_slot() {
        let (chain, bot) = chain();
        let mut state = PaperState::default();
        chain.apply(&mut state, bot, &vault_call(1)).unwrap();
        chain.apply(&mut state, bot, &vault_call(5)).unwrap();
        assert_eq!(state.vault[0], U256::from(5u64));
        assert_eq!(state.vault.len(), 5);
    }

    #[test]
    fn batch_with_unknown_selector_changes_nothing() {
        let (chain, bot) = chain();
        let mut state = PaperState::default();
        let batch = IStateRelayerV2::batchCallByBotCall {
            funcCalls: vec![
                vault_call(9).into(),
                Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]),
            ],
        }
        .abi_encode();
        let err = chain.apply(&mut state, bot, &batch).unwrap_err();
        assert_eq!(err, RevertReason::LowLevelCall);
        assert_eq!(state, PaperState::default());
    }

    #[test]
    fn oracle_length_mismatch_reverts() {
        let (chain, bot) = chain();
        let call = IStateRelayerV2::updateOracleInfoCall {
            oracle: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
            oracleInfo: vec![IStateRelayerV2::OracleInfo {
                price: U256::from(1u64),
                tickerType: "CRYPTO".to_string(),
                oraclesActive: U256::from(1u64),
                oraclesTotal: U256::from(1u64),
            }],
        }
        .abi_encode();
        let mut state = PaperState::default();
        assert_eq!(
            chain.apply(&mut state, bot, &call),
            Err(RevertReason::OracleLengthMismatch)
        );
    }

    #[tokio::test]
    async fn offline_chain_fails_transport_calls() {
        let (chain, bot) = chain();
        chain.set_offline(true);
        assert!(chain.pending_nonce(bot).await.is_err());
        chain.set_offline(false);
        assert_eq!(chain.pending_nonce(bot).await.unwrap(), 0);
    }
}
