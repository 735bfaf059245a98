//! DeFiChain State Relayer
//!
//! Pulls aggregate statistics from the Ocean indexer, normalizes them to
//! 18-decimal fixed point and publishes them to the StateRelayer contract.
//! The binary in `main.rs` runs one cycle per invocation; everything else
//! is exposed here for tests and embedding.

pub mod config;
pub mod cycle;
pub mod error;
pub mod fixed_point;
pub mod normalize;
pub mod ocean;
pub mod relay;

pub use config::{ConfigViolation, RelayerConfig};
pub use cycle::{CycleReport, CycleStatus, RelayCycle, StatsSource};
pub use error::{ConfigError, CycleError};
pub use fixed_point::{to_scaled_integer, ScaledInteger, Unrepresentable, MAX_UINT256};
