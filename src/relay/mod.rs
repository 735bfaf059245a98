//! Relay: planning, signing and submitting StateRelayer updates.

pub mod contract;
pub mod executor;
pub mod fees;
pub mod outcome;
pub mod paper;
pub mod planner;
pub mod rpc;

pub use contract::{RevertReason, SchemaVersion};
pub use executor::{ExecutorConfig, RelayExecutor};
pub use fees::{FeeMode, FeeParams, SigningContext};
pub use outcome::{RelayOutcome, RelayStatus, SubmissionError};
pub use paper::{PaperChain, PaperState};
pub use planner::{
    GasLimits, PlanningError, Slot, SubmissionMode, UpdateOperation, UpdatePlan, UpdatePlanner,
};
pub use rpc::{ChainTransport, JsonRpcTransport};
