//! Batch sweep driver.
//!
//! Walks the batch ladder in ascending order and, for every selected model
//! (in selection order), asks the estimator for a prefill and a decode
//! estimate. A pair whose estimate fails falls back to a profiling call and
//! becomes a minimum-chip-count row instead.
//!
//! ```text
//! for batch in ladder where batch <= max_batch:
//!   for model in models:
//!     prefill, decode = estimate(..)      -> 2 performance rows
//!     on failure: profile(..)             -> 1 capacity row
//! ```
//!
//! The driver never fails once started. Requests are validated up front by
//! [`Sweep::run`], which refuses an empty model selection without calling
//! the estimator.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EstimateError, Result, SweepError};
use crate::estimator::{EstimateQuery, Estimator, Phase};
use crate::hardware::HardwareSpec;
use crate::models::Quantization;
use crate::report::{
    min_chips, CapacitySample, FallbackCause, PerformanceSample, SweepIssue, SweepReport,
};

/// Batch sizes probed by every sweep.
pub const STANDARD_LADDER: [u32; 21] = [
    1, 2, 4, 8, 16, 32, 48, 64, 80, 96, 112, 128, 136, 144, 160, 172, 180, 200, 224, 240, 256,
];

/// Strictly increasing sequence of positive batch sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchLadder {
    sizes: Vec<u32>,
}

impl Default for BatchLadder {
    fn default() -> Self {
        Self::standard()
    }
}

impl BatchLadder {
    pub fn standard() -> Self {
        Self { sizes: STANDARD_LADDER.to_vec() }
    }

    /// Custom ladder. Rejects empty, zero-containing or unsorted input.
    pub fn new(sizes: Vec<u32>) -> Result<Self> {
        if sizes.is_empty() {
            return Err(SweepError::InvalidLadder("empty".into()));
        }
        if sizes.contains(&0) {
            return Err(SweepError::InvalidLadder("batch size 0".into()));
        }
        if let Some(w) = sizes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SweepError::InvalidLadder(format!(
                "{} followed by {} is not strictly increasing",
                w[0], w[1]
            )));
        }
        Ok(Self { sizes })
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Batch sizes at or below `ceiling`, ascending.
    pub fn eligible(&self, ceiling: u32) -> impl Iterator<Item = u32> + '_ {
        self.sizes.iter().copied().take_while(move |&b| b <= ceiling)
    }
}

/// Inputs for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub hardware: HardwareSpec,
    /// Fraction of peak the system achieves, in (0, 1].
    pub efficiency: f64,
    /// Tensor-parallel degree.
    pub nodes: u32,
    /// Model ids in selection order.
    pub models: Vec<String>,
    #[serde(default)]
    pub quantization: Quantization,
    /// Largest batch size to probe.
    pub max_batch: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub beam_size: u32,
}

impl SweepRequest {
    /// Check every field range. An empty model list is
    /// [`SweepError::EmptySelection`].
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(SweepError::EmptySelection);
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(SweepError::InvalidRequest(format!(
                "efficiency {} outside (0, 1]",
                self.efficiency
            )));
        }
        if self.nodes == 0 {
            return Err(SweepError::InvalidRequest("nodes must be >= 1".into()));
        }
        if self.max_batch == 0 {
            return Err(SweepError::InvalidRequest("max batch must be >= 1".into()));
        }
        if self.beam_size == 0 {
            return Err(SweepError::InvalidRequest("beam size must be >= 1".into()));
        }
        if let Some(field) = self.hardware.invalid_field() {
            return Err(SweepError::InvalidRequest(format!(
                "hardware {field} must be a positive number"
            )));
        }
        Ok(())
    }

    fn query<'a>(&'a self, phase: Phase, model_id: &'a str, batch_size: u32) -> EstimateQuery<'a> {
        EstimateQuery {
            phase,
            model_id,
            batch_size,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            beam_size: self.beam_size,
            quantization: self.quantization,
            hardware: &self.hardware,
            efficiency: self.efficiency,
            parallelism: self.nodes,
        }
    }
}

/// Which estimator failures go to the capacity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Only `CapacityExceeded`; other failures are reported as rejected pairs.
    #[default]
    CapacityOnly,
    /// Every failure is treated as a capacity shortfall.
    Conflate,
}

/// Sweep driver bound to an estimator.
#[derive(Debug, Clone)]
pub struct Sweep<E> {
    estimator: E,
    ladder: BatchLadder,
    policy: FallbackPolicy,
}

impl<E: Estimator> Sweep<E> {
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            ladder: BatchLadder::standard(),
            policy: FallbackPolicy::default(),
        }
    }

    pub fn with_ladder(mut self, ladder: BatchLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ladder(&self) -> &BatchLadder {
        &self.ladder
    }

    /// Validate `request` and run the full sweep.
    pub fn run(&self, request: &SweepRequest) -> Result<SweepReport> {
        request.validate()?;
        Ok(self.drive(request))
    }

    fn drive(&self, request: &SweepRequest) -> SweepReport {
        info!(
            models = request.models.len(),
            max_batch = request.max_batch,
            nodes = request.nodes,
            quantization = request.quantization.name(),
            "starting batch sweep"
        );

        let mut report = SweepReport::default();
        for batch in self.ladder.eligible(request.max_batch) {
            debug!(batch, "sweeping batch size");
            for model_id in &request.models {
                self.sweep_pair(request, model_id, batch, &mut report);
            }
        }

        info!(
            performance_rows = report.performance.len(),
            capacity_rows = report.capacity.len(),
            rejected = report.rejected.len(),
            "batch sweep finished"
        );
        report
    }

    fn sweep_pair(&self, request: &SweepRequest, model_id: &str, batch: u32, report: &mut SweepReport) {
        let display_name = self.estimator.resolve_model_name(model_id).unwrap_or_else(|err| {
            debug!(model = model_id, %err, "no display name, using id");
            model_id.to_string()
        });

        // Both phases must succeed before either row is kept
        let estimates = self
            .estimator
            .estimate(&request.query(Phase::Prefill, model_id, batch))
            .and_then(|prefill| {
                let decode = self.estimator.estimate(&request.query(Phase::Decode, model_id, batch))?;
                Ok((prefill, decode))
            });

        match estimates {
            Ok((prefill, decode)) => {
                report
                    .performance
                    .push(PerformanceSample::new(&display_name, Phase::Prefill, batch, &prefill));
                report
                    .performance
                    .push(PerformanceSample::new(&display_name, Phase::Decode, batch, &decode));
            }
            Err(err) => {
                let cause = match (err.is_capacity(), self.policy) {
                    (true, _) => FallbackCause::CapacityExceeded,
                    (false, FallbackPolicy::Conflate) => FallbackCause::EstimatorError,
                    (false, FallbackPolicy::CapacityOnly) => {
                        debug!(model = model_id, batch, %err, "estimate rejected");
                        report.rejected.push(issue(model_id, batch, &err));
                        return;
                    }
                };
                debug!(model = model_id, batch, %err, "falling back to capacity estimate");
                self.fallback(request, model_id, batch, cause, report);
            }
        }
    }

    fn fallback(
        &self,
        request: &SweepRequest,
        model_id: &str,
        batch: u32,
        cause: FallbackCause,
        report: &mut SweepReport,
    ) {
        let profile = match self.estimator.profile(&request.query(Phase::Decode, model_id, batch)) {
            Ok(profile) => profile,
            Err(err) => {
                debug!(model = model_id, batch, %err, "profiling failed");
                report.rejected.push(issue(model_id, batch, &err));
                return;
            }
        };

        let memory_mb = request.hardware.memory_mb();
        let required_mb = profile.total_mb();
        report.capacity.push(CapacitySample {
            model: model_id.to_string(),
            memory_mb,
            batch,
            beam_size: request.beam_size,
            input_tokens: request.input_tokens,
            output_tokens: request.output_tokens,
            required_mb,
            min_chips: min_chips(required_mb, memory_mb),
            cause,
        });
    }
}

fn issue(model_id: &str, batch: u32, err: &EstimateError) -> SweepIssue {
    SweepIssue {
        model: model_id.to_string(),
        batch,
        error: err.to_string(),
    }
}

/// Run one sweep with the standard ladder and default policy.
pub fn sweep<E: Estimator>(request: &SweepRequest, estimator: E) -> Result<SweepReport> {
    Sweep::new(estimator).run(request)
}
