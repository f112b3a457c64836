//! The estimator interface the sweep driver consumes.
//!
//! An estimator answers three questions for a (model, batch, hardware)
//! configuration: how fast is each serving phase, how much memory does the
//! model need, and what is the model called. Implementations must be safe to
//! share across concurrent sweeps, so every method takes `&self`.

use serde::{Deserialize, Serialize};

use crate::error::EstimateError;
use crate::hardware::HardwareSpec;
use crate::models::Quantization;

/// Serving phase.
///
/// Ordering is `Prefill < Decode`, which is the facet order of every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Prefill,
    Decode,
}

impl Phase {
    /// Fixed categorical order.
    pub const ORDER: [Phase; 2] = [Phase::Prefill, Phase::Decode];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Prefill => "Prefill",
            Self::Decode => "Decode",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One estimator call.
#[derive(Debug, Clone, Copy)]
pub struct EstimateQuery<'a> {
    pub phase: Phase,
    pub model_id: &'a str,
    pub batch_size: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Parallel beams; only meaningful for decode.
    pub beam_size: u32,
    pub quantization: Quantization,
    pub hardware: &'a HardwareSpec,
    /// Fraction of peak compute and bandwidth achieved, in (0, 1].
    pub efficiency: f64,
    /// Devices one model instance is sharded across.
    pub parallelism: u32,
}

/// Where the time of one phase goes, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeBreakdown {
    pub gemm_ms: f64,
    pub attn_ms: f64,
    pub comm_ms: f64,
}

impl RuntimeBreakdown {
    #[inline]
    pub fn total_ms(&self) -> f64 {
        self.gemm_ms + self.attn_ms + self.comm_ms
    }
}

/// Timing for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub latency_ms: f64,
    pub throughput_tps: f64,
    pub breakdown: RuntimeBreakdown,
}

/// Memory summary from a profiling call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryProfile {
    pub model_weights_mb: f64,
    pub kv_cache_mb: f64,
}

impl MemoryProfile {
    #[inline]
    pub fn total_mb(&self) -> f64 {
        self.model_weights_mb + self.kv_cache_mb
    }
}

/// Performance model consumed by the sweep.
pub trait Estimator: Send + Sync {
    /// Canonical display name for a model id.
    fn resolve_model_name(&self, model_id: &str) -> Result<String, EstimateError>;

    /// Latency, throughput and breakdown for one phase.
    ///
    /// Fails with [`EstimateError::CapacityExceeded`] when the model does not
    /// fit the requested devices.
    fn estimate(&self, query: &EstimateQuery<'_>) -> Result<Estimate, EstimateError>;

    /// Unsharded memory footprint (weights and KV cache) for the query.
    fn profile(&self, query: &EstimateQuery<'_>) -> Result<MemoryProfile, EstimateError>;
}

impl<E: Estimator + ?Sized> Estimator for &E {
    fn resolve_model_name(&self, model_id: &str) -> Result<String, EstimateError> {
        (**self).resolve_model_name(model_id)
    }

    fn estimate(&self, query: &EstimateQuery<'_>) -> Result<Estimate, EstimateError> {
        (**self).estimate(query)
    }

    fn profile(&self, query: &EstimateQuery<'_>) -> Result<MemoryProfile, EstimateError> {
        (**self).profile(query)
    }
}
