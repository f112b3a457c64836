//! Analytic roofline estimator.
//!
//! Models one serving phase as three additive parts:
//! - GEMM: max of compute-bound time and weight-streaming time
//! - Attention: max of score/context compute and KV-cache traffic
//! - Communication: two ring all-reduces per layer when sharded
//!
//! Everything is per device: compute and memory traffic are divided by the
//! parallelism degree, communication grows with it.
//!
//! # Feasibility
//!
//! Before timing anything the estimator checks that weights plus KV cache,
//! split across the devices, fit in one device's memory. If not it returns
//! [`EstimateError::CapacityExceeded`] so the sweep can fall back to a
//! chip-count estimate.

use tracing::trace;

use crate::error::EstimateError;
use crate::estimator::{Estimate, EstimateQuery, Estimator, MemoryProfile, Phase, RuntimeBreakdown};
use crate::models::{self, ModelConfig};

const MIB: f64 = 1024.0 * 1024.0;

/// Fixed per-step latency of one collective hop.
pub const DEFAULT_LINK_LATENCY_NS: u64 = 2_000;

/// Roofline estimator over the static model catalog.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticEstimator {
    /// Latency per ring step in nanoseconds.
    pub link_latency_ns: u64,
    /// Bytes per activation element on the wire.
    pub activation_bytes: f64,
}

impl Default for AnalyticEstimator {
    fn default() -> Self {
        Self {
            link_latency_ns: DEFAULT_LINK_LATENCY_NS,
            activation_bytes: 2.0, // bf16 activations
        }
    }
}

/// Ring all-reduce time in nanoseconds.
///
/// `latency x (p-1)` hops plus `payload x 2(p-1)/p` bytes over the link.
/// Zero for a single device.
#[inline]
pub fn allreduce_time_ns(payload_bytes: f64, bw_bytes_per_s: f64, latency_ns: u64, tp: u32) -> f64 {
    if tp <= 1 {
        return 0.0;
    }
    let p = tp as f64;
    let factor = 2.0 * (p - 1.0) / p;
    let transfer_ns = payload_bytes * factor / bw_bytes_per_s * 1e9;
    latency_ns as f64 * (p - 1.0) + transfer_ns
}

/// Bytes resident for one query, before sharding.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    weights_bytes: f64,
    kv_bytes: f64,
}

/// Sequences held in the KV cache and their context length.
fn sequences_and_context(query: &EstimateQuery<'_>) -> (f64, f64) {
    match query.phase {
        Phase::Prefill => (query.batch_size as f64, query.input_tokens as f64),
        Phase::Decode => (
            query.batch_size as f64 * query.beam_size as f64,
            query.input_tokens as f64 + query.output_tokens as f64,
        ),
    }
}

fn footprint(model: &ModelConfig, query: &EstimateQuery<'_>) -> Footprint {
    let (sequences, context) = sequences_and_context(query);
    Footprint {
        weights_bytes: model.weight_bytes(query.quantization),
        kv_bytes: model.kv_bytes_per_token(query.quantization) * sequences * context,
    }
}

impl AnalyticEstimator {
    fn validate(&self, query: &EstimateQuery<'_>) -> Result<&'static ModelConfig, EstimateError> {
        let model = models::lookup(query.model_id)
            .ok_or_else(|| EstimateError::UnknownModel(query.model_id.to_string()))?;

        if let Some(field) = query.hardware.invalid_field() {
            return Err(EstimateError::InvalidConfiguration(format!(
                "hardware {field} must be a positive number"
            )));
        }
        if !(query.efficiency > 0.0 && query.efficiency <= 1.0) {
            return Err(EstimateError::InvalidConfiguration(format!(
                "efficiency {} outside (0, 1]",
                query.efficiency
            )));
        }
        if query.parallelism == 0 {
            return Err(EstimateError::InvalidConfiguration("parallelism must be >= 1".into()));
        }
        if query.batch_size == 0 || query.beam_size == 0 {
            return Err(EstimateError::InvalidConfiguration(
                "batch and beam size must be >= 1".into(),
            ));
        }
        Ok(model)
    }
}

impl Estimator for AnalyticEstimator {
    fn resolve_model_name(&self, model_id: &str) -> Result<String, EstimateError> {
        models::lookup(model_id)
            .map(|m| m.id.to_string())
            .ok_or_else(|| EstimateError::UnknownModel(model_id.to_string()))
    }

    fn estimate(&self, query: &EstimateQuery<'_>) -> Result<Estimate, EstimateError> {
        let model = self.validate(query)?;
        let fp = footprint(model, query);
        let tp = query.parallelism as f64;

        let required_mb = (fp.weights_bytes + fp.kv_bytes) / tp / MIB;
        let available_mb = query.hardware.memory_mb();
        if required_mb > available_mb {
            return Err(EstimateError::CapacityExceeded {
                model: model.id.to_string(),
                required_mb,
                available_mb,
            });
        }

        let flops = query.hardware.peak_flops() * query.efficiency;
        let mem_bw = query.hardware.memory_bw_bytes() * query.efficiency;
        let batch = query.batch_size as f64;
        let layers = model.num_layers as f64;
        let attn_width = (model.num_heads as u64 * model.head_dim()) as f64;
        let (sequences, context) = sequences_and_context(query);

        // Tokens pushed through the weights in one forward pass
        let tokens = match query.phase {
            Phase::Prefill => batch * query.input_tokens as f64,
            Phase::Decode => sequences,
        };

        let gemm_flops = 2.0 * model.active_params() as f64 * tokens / tp;
        let gemm_s = (gemm_flops / flops).max(fp.weights_bytes / tp / mem_bw);

        // QK^T and AV: 2 matmuls x 2 flops per MAC
        let attn_flops = match query.phase {
            Phase::Prefill => 4.0 * layers * batch * context * context * attn_width / tp,
            Phase::Decode => 4.0 * layers * sequences * context * attn_width / tp,
        };
        let attn_s = (attn_flops / flops).max(fp.kv_bytes / tp / mem_bw);

        let payload = tokens * model.hidden_size as f64 * self.activation_bytes;
        let comm_ns = 2.0
            * layers
            * allreduce_time_ns(
                payload,
                query.hardware.icn_bw_bytes(),
                self.link_latency_ns,
                query.parallelism,
            );

        let breakdown = RuntimeBreakdown {
            gemm_ms: gemm_s * 1e3,
            attn_ms: attn_s * 1e3,
            comm_ms: comm_ns / 1e6,
        };
        let latency_ms = breakdown.total_ms();
        let produced = match query.phase {
            Phase::Prefill => batch * query.input_tokens as f64,
            Phase::Decode => batch,
        };
        let throughput_tps = if latency_ms > 0.0 { produced * 1e3 / latency_ms } else { 0.0 };

        trace!(
            model = model.id,
            phase = %query.phase,
            batch = query.batch_size,
            latency_ms,
            throughput_tps,
            "estimated"
        );

        Ok(Estimate {
            latency_ms,
            throughput_tps,
            breakdown,
        })
    }

    fn profile(&self, query: &EstimateQuery<'_>) -> Result<MemoryProfile, EstimateError> {
        let model = models::lookup(query.model_id)
            .ok_or_else(|| EstimateError::UnknownModel(query.model_id.to_string()))?;
        let fp = footprint(model, query);
        Ok(MemoryProfile {
            model_weights_mb: fp.weights_bytes / MIB,
            kv_cache_mb: fp.kv_bytes / MIB,
        })
    }
}
