//! Model catalog and quantization formats.
//!
//! The catalog is a static table of transformer shapes. Everything the
//! estimator derives (parameter count, weight bytes, KV bytes per token)
//! comes from these few numbers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Numeric format for weights and KV cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    #[default]
    Bf16,
    Int8,
    Int4,
    Int2,
    Fp32,
}

impl Quantization {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Bf16 => 16,
            Self::Int8 => 8,
            Self::Int4 => 4,
            Self::Int2 => 2,
            Self::Fp32 => 32,
        }
    }

    #[inline]
    pub fn bytes_per_value(&self) -> f64 {
        self.bits() as f64 / 8.0
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bf16 => "bf16",
            Self::Int8 => "int8",
            Self::Int4 => "int4",
            Self::Int2 => "int2",
            Self::Fp32 => "fp32",
        }
    }
}

/// Shape of one transformer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Canonical id, also used as display name.
    pub id: &'static str,
    pub num_layers: u32,
    pub hidden_size: u32,
    pub num_heads: u32,
    /// Key/value heads (< `num_heads` for grouped-query attention).
    pub num_kv_heads: u32,
    /// MLP inner width per expert.
    pub intermediate_size: u32,
    pub vocab_size: u32,
    /// 1 for dense models.
    pub num_experts: u32,
    /// Experts evaluated per token.
    pub active_experts: u32,
    /// Three MLP projections (gate/up/down) instead of two.
    pub gated_mlp: bool,
}

impl ModelConfig {
    #[inline]
    pub fn head_dim(&self) -> u64 {
        (self.hidden_size / self.num_heads.max(1)) as u64
    }

    fn attention_params(&self) -> u64 {
        let h = self.hidden_size as u64;
        let kv = self.num_kv_heads as u64 * self.head_dim();
        // Q and O are h x h; K and V are h x kv
        2 * h * h + 2 * h * kv
    }

    fn expert_params(&self) -> u64 {
        let mats = if self.gated_mlp { 3 } else { 2 };
        mats * self.hidden_size as u64 * self.intermediate_size as u64
    }

    fn embedding_params(&self) -> u64 {
        // Input embedding plus LM head
        2 * self.vocab_size as u64 * self.hidden_size as u64
    }

    /// Total parameters stored, all experts included.
    pub fn total_params(&self) -> u64 {
        let per_layer = self.attention_params() + self.num_experts as u64 * self.expert_params();
        self.num_layers as u64 * per_layer + self.embedding_params()
    }

    /// Parameters touched per token (active experts only, LM head included).
    pub fn active_params(&self) -> u64 {
        let experts = self.active_experts.min(self.num_experts) as u64;
        let per_layer = self.attention_params() + experts * self.expert_params();
        self.num_layers as u64 * per_layer + self.vocab_size as u64 * self.hidden_size as u64
    }

    /// Weight footprint in bytes.
    pub fn weight_bytes(&self, quant: Quantization) -> f64 {
        self.total_params() as f64 * quant.bytes_per_value()
    }

    /// KV-cache bytes for one token of one sequence, across all layers.
    pub fn kv_bytes_per_token(&self, quant: Quantization) -> f64 {
        let per_layer = 2 * self.num_kv_heads as u64 * self.head_dim();
        (self.num_layers as u64 * per_layer) as f64 * quant.bytes_per_value()
    }
}

#[allow(clippy::too_many_arguments)]
const fn dense(
    id: &'static str,
    num_layers: u32,
    hidden_size: u32,
    num_heads: u32,
    num_kv_heads: u32,
    intermediate_size: u32,
    vocab_size: u32,
    gated_mlp: bool,
) -> ModelConfig {
    ModelConfig {
        id,
        num_layers,
        hidden_size,
        num_heads,
        num_kv_heads,
        intermediate_size,
        vocab_size,
        num_experts: 1,
        active_experts: 1,
        gated_mlp,
    }
}

const fn moe(base: ModelConfig, num_experts: u32, active_experts: u32) -> ModelConfig {
    ModelConfig {
        num_experts,
        active_experts,
        ..base
    }
}

/// Models available for comparison, in menu order.
pub static MODELS: [ModelConfig; 22] = [
    dense("meta-llama/Llama-2-7B", 32, 4096, 32, 32, 11008, 32000, true),
    dense("meta-llama/Meta-Llama-3.1-8B", 32, 4096, 32, 8, 14336, 128256, true),
    dense("meta-llama/Llama-2-13B", 40, 5120, 40, 40, 13824, 32000, true),
    dense("meta-llama/Llama-2-70B", 80, 8192, 64, 8, 28672, 32000, true),
    dense("meta-llama/Meta-Llama-3.1-405B", 126, 16384, 128, 8, 53248, 128256, true),
    dense("google/gemma-2B", 18, 2048, 8, 1, 16384, 256000, true),
    dense("google/gemma-7B", 28, 3072, 16, 16, 24576, 256000, true),
    dense("google/gemma-2-9B", 42, 3584, 16, 8, 14336, 256000, true),
    dense("google/gemma-2-27B", 46, 4608, 32, 16, 36864, 256000, true),
    dense("mistralai/mistral-7B", 32, 4096, 32, 8, 14336, 32000, true),
    moe(dense("mistralai/Mixtral-8x7B", 32, 4096, 32, 8, 14336, 32000, true), 8, 2),
    dense("microsoft/phi3mini", 32, 3072, 32, 32, 8192, 32064, true),
    dense("microsoft/phi3small", 32, 4096, 32, 8, 14336, 100352, false),
    dense("microsoft/phi3medium", 40, 5120, 40, 10, 17920, 32064, true),
    moe(dense("databricks/dbrx-base", 40, 6144, 48, 8, 10752, 100352, true), 16, 4),
    moe(dense("xai-org/grok-1", 64, 6144, 48, 8, 32768, 131072, true), 8, 2),
    dense("openai/gpt-3", 96, 12288, 96, 96, 49152, 50257, false),
    moe(dense("openai/gpt-4", 120, 12288, 96, 96, 49152, 100256, false), 16, 2),
    dense("facebook/opt-125m", 12, 768, 12, 12, 3072, 50272, false),
    dense("facebook/opt-350m", 24, 1024, 16, 16, 4096, 50272, false),
    dense("facebook/opt-1.3b", 24, 2048, 32, 32, 8192, 50272, false),
    dense("facebook/opt-175b", 96, 12288, 96, 96, 49152, 50272, false),
];

/// Find a model by full id or by the name after `/`, case-insensitive.
pub fn lookup(id: &str) -> Option<&'static ModelConfig> {
    let wanted = id.trim();
    MODELS.iter().find(|m| {
        m.id.eq_ignore_ascii_case(wanted)
            || m.id
                .rsplit('/')
                .next()
                .is_some_and(|short| short.eq_ignore_ascii_case(wanted))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_full_and_short() {
        let full = lookup("meta-llama/Llama-2-7B").unwrap();
        let short = lookup("llama-2-7b").unwrap();
        assert_eq!(full, short);
        assert!(lookup("nobody/nothing").is_none());
    }

    #[test]
    fn test_catalog_ids_unique() {
        for (i, a) in MODELS.iter().enumerate() {
            for b in &MODELS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_llama2_7b_param_count() {
        let m = lookup("meta-llama/Llama-2-7B").unwrap();
        let billions = m.total_params() as f64 / 1e9;
        assert!((6.5..7.0).contains(&billions), "got {billions:.2}B");
    }

    #[test]
    fn test_moe_active_less_than_total() {
        let m = lookup("mistralai/Mixtral-8x7B").unwrap();
        assert!(m.active_params() < m.total_params() / 2);

        let dense = lookup("mistralai/mistral-7B").unwrap();
        assert!(dense.active_params() < dense.total_params());
    }

    #[test]
    fn test_quantization_scales_weights() {
        let m = lookup("meta-llama/Llama-2-13B").unwrap();
        let bf16 = m.weight_bytes(Quantization::Bf16);
        let int8 = m.weight_bytes(Quantization::Int8);
        let int4 = m.weight_bytes(Quantization::Int4);
        assert_eq!(bf16, int8 * 2.0);
        assert_eq!(int8, int4 * 2.0);
        assert_eq!(m.weight_bytes(Quantization::Fp32), bf16 * 2.0);
    }

    #[test]
    fn test_gqa_shrinks_kv() {
        let mha = lookup("meta-llama/Llama-2-7B").unwrap();
        let gqa = lookup("meta-llama/Meta-Llama-3.1-8B").unwrap();
        // 32 KV heads vs 8 at the same layer count and head size
        assert_eq!(
            mha.kv_bytes_per_token(Quantization::Bf16),
            4.0 * gqa.kv_bytes_per_token(Quantization::Bf16)
        );
        // 2 * 32 layers * 32 heads * 128 dim * 2 bytes
        assert_eq!(mha.kv_bytes_per_token(Quantization::Bf16), 524_288.0);
    }
}
