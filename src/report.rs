//! Sweep results: the performance table, the capacity table, and the chart
//! view built from them.
//!
//! A [`SweepReport`] always carries both tables. [`SweepReport::outcome`]
//! picks what to show: the chart when at least one configuration ran, the
//! capacity table when none did but some were sized, and the rejected pairs
//! when the estimator could not handle any of them.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::estimator::{Estimate, Phase};

/// One row of the performance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Display name from the estimator's config lookup.
    pub model: String,
    pub phase: Phase,
    pub batch: u32,
    pub latency_ms: f64,
    pub tokens_per_s: f64,
    pub gemm_ms: f64,
    pub attn_ms: f64,
    pub comm_ms: f64,
}

impl PerformanceSample {
    pub fn new(model: &str, phase: Phase, batch: u32, estimate: &Estimate) -> Self {
        Self {
            model: model.to_string(),
            phase,
            batch,
            latency_ms: estimate.latency_ms,
            tokens_per_s: estimate.throughput_tps,
            gemm_ms: estimate.breakdown.gemm_ms,
            attn_ms: estimate.breakdown.attn_ms,
            comm_ms: estimate.breakdown.comm_ms,
        }
    }

    /// CSV header.
    pub fn csv_header() -> &'static str {
        "Model,Stage,Batch,Latency(ms),Tokens/s,GEMM Time,Attn Time,Communication Time"
    }

    /// Format as CSV row.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{:.3},{:.2},{:.3},{:.3},{:.3}",
            csv_field(&self.model),
            self.phase,
            self.batch,
            self.latency_ms,
            self.tokens_per_s,
            self.gemm_ms,
            self.attn_ms,
            self.comm_ms
        )
    }
}

/// Why a pair ended up in the capacity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackCause {
    /// The estimator reported the model does not fit.
    CapacityExceeded,
    /// Any other estimator failure, routed here under the legacy policy.
    EstimatorError,
}

/// One row of the capacity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySample {
    /// Model id as requested.
    pub model: String,
    /// Per-device memory in MB.
    pub memory_mb: f64,
    pub batch: u32,
    pub beam_size: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Weights plus KV cache in MB.
    pub required_mb: f64,
    /// Devices needed to hold `required_mb`, at least 1.
    pub min_chips: u32,
    pub cause: FallbackCause,
}

impl CapacitySample {
    /// CSV header.
    pub fn csv_header() -> &'static str {
        "Model,NPU memory,Batch,Beam size,Input Tokens,Output Tokens,Min. Chips"
    }

    /// Format as CSV row.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{:.0},{},{},{},{},{}",
            csv_field(&self.model),
            self.memory_mb,
            self.batch,
            self.beam_size,
            self.input_tokens,
            self.output_tokens,
            self.min_chips
        )
    }
}

/// Quote a CSV field holding a comma, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Devices needed to hold `required_mb` when each has `capacity_mb`.
///
/// `ceil(required / capacity)`, never less than 1. `capacity_mb` must be
/// positive.
#[inline]
pub fn min_chips(required_mb: f64, capacity_mb: f64) -> u32 {
    let chips = (required_mb / capacity_mb).ceil();
    if chips.is_finite() && chips >= 1.0 {
        chips as u32
    } else {
        1
    }
}

/// A pair that produced neither table's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepIssue {
    pub model: String,
    pub batch: u32,
    pub error: String,
}

/// Everything one sweep produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub performance: Vec<PerformanceSample>,
    pub capacity: Vec<CapacitySample>,
    pub rejected: Vec<SweepIssue>,
}

/// What a caller should display.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome<'a> {
    /// At least one configuration ran.
    Chart(Chart),
    /// Nothing fit: minimum chip counts per configuration.
    CapacityShortfall(&'a [CapacitySample]),
    /// Every pair was rejected by the estimator; more hardware will not help.
    NothingEstimated(&'a [SweepIssue]),
}

impl SweepReport {
    /// No configuration ran and at least one was sized: the hardware is too
    /// small.
    pub fn is_capacity_shortfall(&self) -> bool {
        self.performance.is_empty() && !self.capacity.is_empty()
    }

    pub fn outcome(&self) -> SweepOutcome<'_> {
        if !self.performance.is_empty() {
            SweepOutcome::Chart(self.chart())
        } else if !self.capacity.is_empty() {
            SweepOutcome::CapacityShortfall(&self.capacity)
        } else {
            SweepOutcome::NothingEstimated(&self.rejected)
        }
    }

    /// Performance rows ordered by phase (Prefill first), stable within a phase.
    pub fn performance_by_phase(&self) -> Vec<&PerformanceSample> {
        let mut rows: Vec<&PerformanceSample> = self.performance.iter().collect();
        rows.sort_by_key(|r| r.phase);
        rows
    }

    /// Faceted throughput chart: one facet per phase, one series per model.
    pub fn chart(&self) -> Chart {
        // Models in first-appearance order so series line up across facets
        let mut models: Vec<&str> = Vec::new();
        for row in &self.performance {
            if !models.contains(&row.model.as_str()) {
                models.push(&row.model);
            }
        }

        let facets = Phase::ORDER
            .iter()
            .map(|&phase| {
                let series: Vec<Series> = models
                    .iter()
                    .filter_map(|&model| {
                        let mut points: Vec<ChartPoint> = self
                            .performance
                            .iter()
                            .filter(|r| r.phase == phase && r.model == model)
                            .map(|r| ChartPoint { batch: r.batch, tokens_per_s: r.tokens_per_s })
                            .collect();
                        if points.is_empty() {
                            return None;
                        }
                        points.sort_by_key(|p| p.batch);
                        Some(Series { model: model.to_string(), points })
                    })
                    .collect();
                let y_range = y_range(&series);
                Facet { phase, series, y_range }
            })
            .collect();

        Chart { facets }
    }

    pub fn performance_csv(&self) -> String {
        let mut out = String::from(PerformanceSample::csv_header());
        out.push('\n');
        for row in self.performance_by_phase() {
            out.push_str(&row.to_csv());
            out.push('\n');
        }
        out
    }

    pub fn capacity_csv(&self) -> String {
        let mut out = String::from(CapacitySample::csv_header());
        out.push('\n');
        for row in &self.capacity {
            out.push_str(&row.to_csv());
            out.push('\n');
        }
        out
    }
}

fn y_range(series: &[Series]) -> Option<(f64, f64)> {
    series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.tokens_per_s))
        .fold(None, |acc, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
}

// ============================================================================
// Chart
// ============================================================================

/// Throughput vs. batch size, faceted by phase.
///
/// Facets are always `[Prefill, Decode]`. Each facet has its own y-range;
/// prefill and decode throughput differ by orders of magnitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub facets: Vec<Facet>,
}

impl Chart {
    pub const X_LABEL: &'static str = "Batch";
    pub const Y_LABEL: &'static str = "Tokens/s";

    pub fn facet(&self, phase: Phase) -> Option<&Facet> {
        self.facets.iter().find(|f| f.phase == phase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub phase: Phase,
    pub series: Vec<Series>,
    /// Min and max throughput in this facet.
    pub y_range: Option<(f64, f64)>,
}

/// One line: a model's throughput across batch sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub model: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub batch: u32,
    pub tokens_per_s: f64,
}
