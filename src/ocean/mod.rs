//! Ocean (DeFiChain whale) upstream API.

pub mod client;
pub mod models;

pub use client::{OceanClient, OceanClientConfig};
pub use models::UpstreamSnapshot;

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_OCEAN_URL: &str = "https://ocean.defichain.com";

/// Network segment of the Ocean URL (`/v0/{network}/...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OceanNetwork {
    MainNet,
    TestNet,
    Changi,
    DevNet,
    Regtest,
}

impl OceanNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainNet => "mainnet",
            Self::TestNet => "testnet",
            Self::Changi => "changi",
            Self::DevNet => "devnet",
            Self::Regtest => "regtest",
        }
    }
}

impl FromStr for OceanNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::MainNet),
            "testnet" => Ok(Self::TestNet),
            "changi" => Ok(Self::Changi),
            "devnet" => Ok(Self::DevNet),
            "regtest" | "local" | "playground" => Ok(Self::Regtest),
            other => Err(format!("unknown ocean network: {}", other)),
        }
    }
}

impl fmt::Display for OceanNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
