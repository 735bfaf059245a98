//! Relay cycle
//!
//! One invocation: fetch → normalize → read signing context → plan →
//! submit → report. Fetch, signing-context and planning failures end the
//! cycle before anything is broadcast. Submission failures are recorded per
//! operation. [`RelayCycle::run`] always returns a report.

use crate::error::CycleError;
use crate::normalize::{normalize_snapshot, NormalizationWarning, NormalizeOptions};
use crate::ocean::{OceanClient, UpstreamSnapshot};
use crate::relay::{
    FeeMode, RelayExecutor, RelayOutcome, RelayStatus, SchemaVersion, SigningContext, Slot,
    SubmissionMode, UpdatePlan, UpdatePlanner,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Where a cycle's upstream data comes from.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_snapshot(
        &self,
        denomination: &str,
        include_prices: bool,
    ) -> Result<UpstreamSnapshot>;
}

#[async_trait]
impl StatsSource for OceanClient {
    async fn fetch_snapshot(
        &self,
        denomination: &str,
        include_prices: bool,
    ) -> Result<UpstreamSnapshot> {
        OceanClient::fetch_snapshot(self, denomination, include_prices).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleStatus {
    Completed,
    CompletedWithFailures,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub schema_version: SchemaVersion,
    pub mode: SubmissionMode,
    pub status: CycleStatus,
    pub outcomes: Vec<RelayOutcome>,
    /// Slots whose failure was transient (network, node rejection).
    pub retryable_slots: Vec<Slot>,
    pub warnings: Vec<NormalizationWarning>,
}

impl CycleReport {
    /// Process exit code for this cycle (configuration errors use 2).
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CycleStatus::Completed => 0,
            CycleStatus::CompletedWithFailures => 1,
            CycleStatus::Failed { .. } => 3,
        }
    }

    pub fn summary(&self) -> String {
        match &self.status {
            CycleStatus::Failed { reason } => format!("cycle failed: {}", reason),
            status => {
                let failed = self.outcomes.iter().filter(|o| o.status.is_failed()).count();
                format!(
                    "cycle {}: {} operations, {} failed, {} warnings",
                    match status {
                        CycleStatus::Completed => "completed",
                        _ => "completed with failures",
                    },
                    self.outcomes.len(),
                    failed,
                    self.warnings.len()
                )
            }
        }
    }
}

pub struct RelayCycle {
    source: Arc<dyn StatsSource>,
    executor: RelayExecutor,
    planner: UpdatePlanner,
    normalize: NormalizeOptions,
    fee_mode: FeeMode,
    dry_run: bool,
}

impl RelayCycle {
    pub fn new(
        source: Arc<dyn StatsSource>,
        executor: RelayExecutor,
        planner: UpdatePlanner,
        normalize: NormalizeOptions,
        fee_mode: FeeMode,
    ) -> Self {
        Self {
            source,
            executor,
            planner,
            normalize,
            fee_mode,
            dry_run: false,
        }
    }

    /// Plan only; nothing is signed or sent.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("relay_cycle", cycle_id = %cycle_id, dry_run = self.dry_run);
        self.run_inner(cycle_id).instrument(span).await
    }

    async fn run_inner(&self, cycle_id: Uuid) -> CycleReport {
        let started_at = Utc::now();
        info!(
            version = self.planner.version.as_str(),
            mode = ?self.planner.mode,
            slots = self.planner.slots.len(),
            "🔄 Relay cycle started"
        );

        let mut warnings = Vec::new();
        let result = self.publish(&mut warnings).await;

        let (status, outcomes) = match result {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| o.status.is_failed()).count();
                let status = if failed == 0 {
                    CycleStatus::Completed
                } else {
                    CycleStatus::CompletedWithFailures
                };
                (status, outcomes)
            }
            Err(e) => {
                error!(error = %e, "❌ Cycle failed");
                (
                    CycleStatus::Failed {
                        reason: e.to_string(),
                    },
                    Vec::new(),
                )
            }
        };

        let retryable_slots = retryable_slots(&outcomes);
        if !retryable_slots.is_empty() {
            warn!(slots = ?retryable_slots, "🔁 Transient failures, next cycle will retry");
        }

        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            schema_version: self.planner.version,
            mode: self.planner.mode,
            status,
            outcomes,
            retryable_slots,
            warnings,
        };
        info!(
            exit_code = report.exit_code(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "🏁 {}",
            report.summary()
        );
        report
    }

    async fn publish(
        &self,
        warnings: &mut Vec<NormalizationWarning>,
    ) -> std::result::Result<Vec<RelayOutcome>, CycleError> {
        let snapshot = self
            .source
            .fetch_snapshot(&self.normalize.denomination, self.normalize.include_oracle)
            .await
            .map_err(|e| CycleError::UpstreamFetch(format!("{:#}", e)))?;

        let records = normalize_snapshot(&snapshot, &self.normalize);
        warnings.extend(records.warnings.iter().cloned());

        let ctx = SigningContext::fetch(
            self.executor.transport(),
            self.executor.address(),
            self.fee_mode,
        )
        .await
        .map_err(|e| CycleError::SigningContext(format!("{:#}", e)))?;

        let plan = self.planner.plan(&records, &ctx)?;

        if self.dry_run {
            return Ok(planned_outcomes(&plan));
        }

        let outcomes = self.executor.execute(&plan).await;
        for outcome in outcomes.iter().filter(|o| o.precision_overflow()) {
            warn!(
                slots = ?outcome.slots,
                fields = ?outcome.flagged_fields,
                "⚠️  Published with sentinel values, review required"
            );
        }
        Ok(outcomes)
    }
}

fn retryable_slots(outcomes: &[RelayOutcome]) -> Vec<Slot> {
    outcomes
        .iter()
        .filter(|o| o.is_retryable())
        .flat_map(|o| o.slots.iter().copied())
        .collect()
}

fn planned_outcomes(plan: &UpdatePlan) -> Vec<RelayOutcome> {
    plan.operations
        .iter()
        .map(|op| {
            info!(
                slots = %op.label(),
                nonce = op.nonce,
                gas_limit = op.gas_limit,
                calldata_bytes = op.calldata.len(),
                "📝 Planned (dry run)"
            );
            let mut outcome = RelayOutcome::for_operation(op, RelayStatus::Planned);
            outcome.nonce = Some(op.nonce);
            outcome
        })
        .collect()
}
