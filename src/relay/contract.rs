//! StateRelayer contract bindings
//!
//! One `sol!` interface per deployed schema. The two versions differ in the
//! DEX info struct (v1 carries a trailing `decimals`) and in the oracle slot,
//! which only exists on v2. Errors are shared and decoded from revert data to
//! classify submission failures.

use crate::normalize::records::{
    BurnRecord, DexRecordSet, MasterNodeRecord, OracleRecordSet, TokenAmountRecord, VaultRecord,
};
use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::{Revert, SolCall, SolError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IStateRelayer {
        struct DEXInfo {
            uint256 primaryTokenPrice;
            uint256 volume24H;
            uint256 totalLiquidity;
            uint256 APR;
            uint256 firstTokenBalance;
            uint256 secondTokenBalance;
            uint256 rewards;
            uint256 commissions;
            uint8 decimals;
        }

        struct MasterNodeInformation {
            uint256 totalValueLockedInMasterNodes;
            uint256 zeroYearLockedNoDecimals;
            uint256 fiveYearLockedNoDecimals;
            uint256 tenYearLockedNoDecimals;
        }

        struct VaultGeneralInformation {
            uint256 noOfVaultsNoDecimals;
            uint256 totalLoanValue;
            uint256 totalCollateralValue;
            uint256 totalCollateralizationRatio;
            uint256 activeAuctionsNoDecimals;
        }

        struct TokenAmount {
            uint256 amount;
            string token;
        }

        struct BurnInfo {
            string addr;
            uint256 amount;
            TokenAmount[] tokens;
            uint256 feeburn;
            uint256 emissionburn;
            uint256 auctionburn;
            uint256 paybackburn;
            TokenAmount[] paybackburntokens;
            TokenAmount[] dexfeetokens;
            uint256 dfipaybackfee;
            TokenAmount[] dfipaybacktokens;
            TokenAmount[] paybackfees;
            TokenAmount[] paybacktokens;
            TokenAmount[] dfip2203;
            TokenAmount[] dfip2206f;
        }

        function updateDEXInfo(string[] calldata dex, DEXInfo[] calldata dexInfo, uint256 totalValueLocked, uint256 total24HVolume) external;
        function updateMasterNodeInformation(MasterNodeInformation calldata masterNodeInformation) external;
        function updateVaultGeneralInformation(VaultGeneralInformation calldata vaultInformation) external;
        function updateBurnInfo(BurnInfo calldata burnInfo) external;
        function batchCallByBot(bytes[] calldata funcCalls) external;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IStateRelayerV2 {
        struct DEXInfo {
            uint256 primaryTokenPrice;
            uint256 volume24H;
            uint256 totalLiquidity;
            uint256 APR;
            uint256 firstTokenBalance;
            uint256 secondTokenBalance;
            uint256 rewards;
            uint256 commissions;
        }

        struct MasterNodeInformation {
            uint256 totalValueLockedInMasterNodes;
            uint256 zeroYearLockedNoDecimals;
            uint256 fiveYearLockedNoDecimals;
            uint256 tenYearLockedNoDecimals;
        }

        struct VaultGeneralInformation {
            uint256 noOfVaultsNoDecimals;
            uint256 totalLoanValue;
            uint256 totalCollateralValue;
            uint256 totalCollateralizationRatio;
            uint256 activeAuctionsNoDecimals;
        }

        struct TokenAmount {
            uint256 amount;
            string token;
        }

        struct BurnInfo {
            string addr;
            uint256 amount;
            TokenAmount[] tokens;
            uint256 feeburn;
            uint256 emissionburn;
            uint256 auctionburn;
            uint256 paybackburn;
            TokenAmount[] paybackburntokens;
            TokenAmount[] dexfeetokens;
            uint256 dfipaybackfee;
            TokenAmount[] dfipaybacktokens;
            TokenAmount[] paybackfees;
            TokenAmount[] paybacktokens;
            TokenAmount[] dfip2203;
            TokenAmount[] dfip2206f;
        }

        struct OracleInfo {
            uint256 price;
            string tickerType;
            uint256 oraclesActive;
            uint256 oraclesTotal;
        }

        function updateDEXInfo(string[] calldata dex, DEXInfo[] calldata dexInfo, uint256 totalValueLocked, uint256 total24HVolume) external;
        function updateMasterNodeInformation(MasterNodeInformation calldata masterNodeInformation) external;
        function updateVaultGeneralInformation(VaultGeneralInformation calldata vaultInformation) external;
        function updateBurnInfo(BurnInfo calldata burnInfo) external;
        function updateOracleInfo(string[] calldata oracle, OracleInfo[] calldata oracleInfo) external;
        function batchCallByBot(bytes[] calldata funcCalls) external;
    }

    error NOT_BOT_ROLE_OR_NOT_IN_BATCH_CALL_IN_BOT();
    error ERROR_IN_LOW_LEVEL_CALLS();
    error DEX_AND_DEXINFO_NOT_HAVE_THE_SAME_LENGTH();
    error ORACLE_AND_ORACLEINFO_NOT_HAVE_THE_SAME_LENGTH();
}

/// Deployed contract schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    pub fn has_oracle_slot(&self) -> bool {
        matches!(self, Self::V2)
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            other => Err(format!("unknown schema version: {}", other)),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CALL ENCODING
// =============================================================================

macro_rules! token_amounts {
    ($module:ident, $list:expr) => {
        $list
            .iter()
            .map(|t: &TokenAmountRecord| $module::TokenAmount {
                amount: t.amount,
                token: t.token.clone(),
            })
            .collect::<Vec<_>>()
    };
}

macro_rules! burn_info {
    ($module:ident, $rec:expr) => {{
        let rec: &BurnRecord = $rec;
        $module::BurnInfo {
            addr: rec.address.clone(),
            amount: rec.amount,
            tokens: token_amounts!($module, rec.tokens),
            feeburn: rec.feeburn,
            emissionburn: rec.emissionburn,
            auctionburn: rec.auctionburn,
            paybackburn: rec.paybackburn,
            paybackburntokens: token_amounts!($module, rec.paybackburntokens),
            dexfeetokens: token_amounts!($module, rec.dexfeetokens),
            dfipaybackfee: rec.dfipaybackfee,
            dfipaybacktokens: token_amounts!($module, rec.dfipaybacktokens),
            paybackfees: token_amounts!($module, rec.paybackfees),
            paybacktokens: token_amounts!($module, rec.paybacktokens),
            dfip2203: token_amounts!($module, rec.dfip2203),
            dfip2206f: token_amounts!($module, rec.dfip2206f),
        }
    }};
}

/// `updateDEXInfo`. Callers check `symbols.len() == pairs.len()` first.
pub fn encode_dex(version: SchemaVersion, dex: &DexRecordSet) -> Bytes {
    let symbols = dex.symbols.clone();
    let tvl = dex.aggregate.total_value_locked;
    let volume = dex.aggregate.total_24h_volume;

    let encoded = match version {
        SchemaVersion::V1 => IStateRelayer::updateDEXInfoCall {
            dex: symbols,
            dexInfo: dex
                .pairs
                .iter()
                .map(|p| IStateRelayer::DEXInfo {
                    primaryTokenPrice: p.primary_token_price,
                    volume24H: p.volume_24h,
                    totalLiquidity: p.total_liquidity,
                    APR: p.apr,
                    firstTokenBalance: p.first_token_balance,
                    secondTokenBalance: p.second_token_balance,
                    rewards: p.rewards,
                    commissions: p.commissions,
                    decimals: u8::try_from(p.decimals).unwrap_or(u8::MAX),
                })
                .collect(),
            totalValueLocked: tvl,
            total24HVolume: volume,
        }
        .abi_encode(),
        SchemaVersion::V2 => IStateRelayerV2::updateDEXInfoCall {
            dex: symbols,
            dexInfo: dex
                .pairs
                .iter()
                .map(|p| IStateRelayerV2::DEXInfo {
                    primaryTokenPrice: p.primary_token_price,
                    volume24H: p.volume_24h,
                    totalLiquidity: p.total_liquidity,
                    APR: p.apr,
                    firstTokenBalance: p.first_token_balance,
                    secondTokenBalance: p.second_token_balance,
                    rewards: p.rewards,
                    commissions: p.commissions,
                })
                .collect(),
            totalValueLocked: tvl,
            total24HVolume: volume,
        }
        .abi_encode(),
    };
    encoded.into()
}

pub fn encode_master_node(version: SchemaVersion, rec: &MasterNodeRecord) -> Bytes {
    let encoded = match version {
        SchemaVersion::V1 => IStateRelayer::updateMasterNodeInformationCall {
            masterNodeInformation: IStateRelayer::MasterNodeInformation {
                totalValueLockedInMasterNodes: rec.total_value_locked,
                zeroYearLockedNoDecimals: rec.zero_year_locked,
                fiveYearLockedNoDecimals: rec.five_year_locked,
                tenYearLockedNoDecimals: rec.ten_year_locked,
            },
        }
        .abi_encode(),
        SchemaVersion::V2 => IStateRelayerV2::updateMasterNodeInformationCall {
            masterNodeInformation: IStateRelayerV2::MasterNodeInformation {
                totalValueLockedInMasterNodes: rec.total_value_locked,
                zeroYearLockedNoDecimals: rec.zero_year_locked,
                fiveYearLockedNoDecimals: rec.five_year_locked,
                tenYearLockedNoDecimals: rec.ten_year_locked,
            },
        }
        .abi_encode(),
    };
    encoded.into()
}

pub fn encode_vault(version: SchemaVersion, rec: &VaultRecord) -> Bytes {
    let encoded = match version {
        SchemaVersion::V1 => IStateRelayer::updateVaultGeneralInformationCall {
            vaultInformation: IStateRelayer::VaultGeneralInformation {
                noOfVaultsNoDecimals: rec.no_of_vaults,
                totalLoanValue: rec.total_loan_value,
                totalCollateralValue: rec.total_collateral_value,
                totalCollateralizationRatio: rec.total_collateralization_ratio,
                activeAuctionsNoDecimals: rec.active_auctions,
            },
        }
        .abi_encode(),
        SchemaVersion::V2 => IStateRelayerV2::updateVaultGeneralInformationCall {
            vaultInformation: IStateRelayerV2::VaultGeneralInformation {
                noOfVaultsNoDecimals: rec.no_of_vaults,
                totalLoanValue: rec.total_loan_value,
                totalCollateralValue: rec.total_collateral_value,
                totalCollateralizationRatio: rec.total_collateralization_ratio,
                activeAuctionsNoDecimals: rec.active_auctions,
            },
        }
        .abi_encode(),
    };
    encoded.into()
}

pub fn encode_burn(version: SchemaVersion, rec: &BurnRecord) -> Bytes {
    let encoded = match version {
        SchemaVersion::V1 => IStateRelayer::updateBurnInfoCall {
            burnInfo: burn_info!(IStateRelayer, rec),
        }
        .abi_encode(),
        SchemaVersion::V2 => IStateRelayerV2::updateBurnInfoCall {
            burnInfo: burn_info!(IStateRelayerV2, rec),
        }
        .abi_encode(),
    };
    encoded.into()
}

/// `updateOracleInfo`; only the v2 schema has it.
pub fn encode_oracle(oracle: &OracleRecordSet) -> Bytes {
    IStateRelayerV2::updateOracleInfoCall {
        oracle: oracle.symbols.clone(),
        oracleInfo: oracle
            .records
            .iter()
            .map(|r| IStateRelayerV2::OracleInfo {
                price: r.price,
                tickerType: r.ticker_type.clone(),
                oraclesActive: r.oracles_active,
                oraclesTotal: r.oracles_total,
            })
            .collect(),
    }
    .abi_encode()
    .into()
}

/// `batchCallByBot` has the same selector and layout in both versions.
pub fn encode_batch(calls: Vec<Bytes>) -> Bytes {
    IStateRelayerV2::batchCallByBotCall { funcCalls: calls }
        .abi_encode()
        .into()
}

// =============================================================================
// REVERT DECODING
// =============================================================================

/// Classified revert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RevertReason {
    NotBot,
    LowLevelCall,
    DexLengthMismatch,
    OracleLengthMismatch,
    /// `Error(string)`, e.g. AccessControl "missing role".
    Message(String),
    /// Undecodable revert data, hex-encoded.
    Unknown(String),
}

impl RevertReason {
    /// Caller identity lacks the role the contract requires.
    pub fn is_authorization(&self) -> bool {
        match self {
            Self::NotBot => true,
            Self::Message(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("missing role") || msg.contains("accesscontrol")
            }
            _ => false,
        }
    }

    /// Raw revert data for this reason, as the contract would emit it.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::NotBot => Bytes::copy_from_slice(
                &NOT_BOT_ROLE_OR_NOT_IN_BATCH_CALL_IN_BOT::SELECTOR,
            ),
            Self::LowLevelCall => Bytes::copy_from_slice(&ERROR_IN_LOW_LEVEL_CALLS::SELECTOR),
            Self::DexLengthMismatch => Bytes::copy_from_slice(
                &DEX_AND_DEXINFO_NOT_HAVE_THE_SAME_LENGTH::SELECTOR,
            ),
            Self::OracleLengthMismatch => Bytes::copy_from_slice(
                &ORACLE_AND_ORACLEINFO_NOT_HAVE_THE_SAME_LENGTH::SELECTOR,
            ),
            Self::Message(msg) => Revert {
                reason: msg.clone(),
            }
            .abi_encode()
            .into(),
            Self::Unknown(raw) => hex::decode(raw.trim_start_matches("0x"))
                .map(Bytes::from)
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBot => f.write_str("NOT_BOT_ROLE_OR_NOT_IN_BATCH_CALL_IN_BOT"),
            Self::LowLevelCall => f.write_str("ERROR_IN_LOW_LEVEL_CALLS"),
            Self::DexLengthMismatch => f.write_str("DEX_AND_DEXINFO_NOT_HAVE_THE_SAME_LENGTH"),
            Self::OracleLengthMismatch => {
                f.write_str("ORACLE_AND_ORACLEINFO_NOT_HAVE_THE_SAME_LENGTH")
            }
            Self::Message(msg) => write!(f, "reverted: {}", msg),
            Self::Unknown(raw) if raw.is_empty() => f.write_str("reverted without data"),
            Self::Unknown(raw) => write!(f, "reverted with data {}", raw),
        }
    }
}

pub fn decode_revert(data: &[u8]) -> RevertReason {
    if data.len() < 4 {
        return RevertReason::Unknown(hex_string(data));
    }
    let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];

    if selector == NOT_BOT_ROLE_OR_NOT_IN_BATCH_CALL_IN_BOT::SELECTOR {
        RevertReason::NotBot
    } else if selector == ERROR_IN_LOW_LEVEL_CALLS::SELECTOR {
        RevertReason::LowLevelCall
    } else if selector == DEX_AND_DEXINFO_NOT_HAVE_THE_SAME_LENGTH::SELECTOR {
        RevertReason::DexLengthMismatch
    } else if selector == ORACLE_AND_ORACLEINFO_NOT_HAVE_THE_SAME_LENGTH::SELECTOR {
        RevertReason::OracleLengthMismatch
    } else if selector == Revert::SELECTOR {
        match Revert::abi_decode(data) {
            Ok(revert) => RevertReason::Message(revert.reason),
            Err(_) => RevertReason::Unknown(hex_string(data)),
        }
    } else {
        RevertReason::Unknown(hex_string(data))
    }
}

fn hex_string(data: &[u8]) -> String {
    if data.is_empty() {
        String::new()
    } else {
        format!("0x{}", hex::encode(data))
    }
}
