//! Command-line interface for the serving comparison.
//!
//! Parameters are organized into categories:
//!
//! ## Models
//! - `--model`: model to compare (repeatable, selection order is kept)
//! - `--quantization`: weight/KV precision
//!
//! ## Use Case
//! - `--use-case`: preset beam and token counts
//! - `--beam`, `--input-tokens`, `--output-tokens`: override the preset
//! - `--max-batch`: largest batch size probed
//!
//! ## HW System
//! - `--system`: hardware preset (`custom` needs all four figures)
//! - `--flops`, `--mem-bw`, `--mem-cap`, `--icn-bw`: override preset figures
//! - `--nodes`: tensor-parallel degree
//! - `--efficiency`: fraction of peak achieved (0, 1]
//!
//! ## Output
//! - `--format`: table, csv or json
//! - `--config`: load the whole request from a JSON file instead

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tokensweep::error::{Result, SweepError};
use tokensweep::{FallbackPolicy, HardwareSpec, Quantization, SweepRequest, SystemPreset, UseCase};

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-2-7B";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tokensweep")]
#[command(author, version, about = "Compare LLM serving throughput across models and hardware")]
pub struct Cli {
    // =========================================================================
    // Models
    // =========================================================================

    /// Model to compare (repeat to compare several)
    #[arg(short, long = "model", default_value = DEFAULT_MODEL, help_heading = "Models")]
    pub models: Vec<String>,

    /// Weight and KV-cache precision
    #[arg(long, value_enum, default_value_t = Quantization::Bf16, help_heading = "Models")]
    pub quantization: Quantization,

    // =========================================================================
    // Use Case
    // =========================================================================

    /// Preset beam size and token counts
    #[arg(long, value_enum, default_value_t = UseCase::QuesAns, help_heading = "Use Case")]
    pub use_case: UseCase,

    /// Largest batch size to probe
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..), help_heading = "Use Case")]
    pub max_batch: u32,

    /// Number of parallel beams (overrides use case)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=16), help_heading = "Use Case")]
    pub beam: Option<u32>,

    /// Prompt tokens (overrides use case)
    #[arg(long, help_heading = "Use Case")]
    pub input_tokens: Option<u32>,

    /// Generated tokens (overrides use case)
    #[arg(long, help_heading = "Use Case")]
    pub output_tokens: Option<u32>,

    // =========================================================================
    // HW System
    // =========================================================================

    /// Hardware preset: A100_40GB_GPU, A100_80GB_GPU, H100_GPU, GH200_GPU,
    /// TPUv4, TPUv5e, MI300X, Gaudi3, or custom
    #[arg(long, default_value = "A100_40GB_GPU", help_heading = "HW System")]
    pub system: String,

    /// Number of devices the model is sharded across
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..), help_heading = "HW System")]
    pub nodes: u32,

    /// Fraction of peak compute and bandwidth achieved (0, 1]
    #[arg(long, default_value = "0.80", help_heading = "HW System")]
    pub efficiency: f64,

    /// Peak compute in TFLOPS
    #[arg(long, help_heading = "HW System")]
    pub flops: Option<f64>,

    /// Memory bandwidth in TB/s
    #[arg(long, help_heading = "HW System")]
    pub mem_bw: Option<f64>,

    /// Memory capacity in GB
    #[arg(long, help_heading = "HW System")]
    pub mem_cap: Option<f64>,

    /// Interconnect bandwidth in GB/s
    #[arg(long, help_heading = "HW System")]
    pub icn_bw: Option<f64>,

    // =========================================================================
    // Output
    // =========================================================================

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, help_heading = "Output")]
    pub format: OutputFormat,

    /// Load the full request from a JSON file (other request flags ignored)
    #[arg(long, value_name = "FILE", help_heading = "Output")]
    pub config: Option<PathBuf>,

    /// Send every estimator failure to the capacity table
    #[arg(long, default_value = "false", help_heading = "Output")]
    pub legacy_fallback: bool,

    /// List catalog models and exit
    #[arg(long, default_value = "false", help_heading = "Output")]
    pub list_models: bool,

    /// List hardware presets and exit
    #[arg(long, default_value = "false", help_heading = "Output")]
    pub list_systems: bool,

    /// Debug logging on stderr
    #[arg(short, long, default_value = "false", help_heading = "Output")]
    pub verbose: bool,
}

impl Cli {
    /// Build the sweep request from flags or the `--config` file.
    pub fn to_request(&self) -> Result<SweepRequest> {
        if let Some(path) = &self.config {
            let text = std::fs::read_to_string(path).map_err(|source| SweepError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok(serde_json::from_str(&text)?);
        }

        let usage = self.use_case.resolve(self.beam, self.input_tokens, self.output_tokens);

        Ok(SweepRequest {
            hardware: self.hardware()?,
            efficiency: self.efficiency,
            nodes: self.nodes,
            models: self.models.clone(),
            quantization: self.quantization,
            max_batch: self.max_batch,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            beam_size: usage.beam_size,
        })
    }

    /// Preset figures with any explicit overrides applied.
    pub fn hardware(&self) -> Result<HardwareSpec> {
        if self.system.eq_ignore_ascii_case("custom") {
            return match (self.flops, self.mem_bw, self.mem_cap, self.icn_bw) {
                (Some(flops), Some(memory_bw), Some(memory_size), Some(icn_bw)) => Ok(HardwareSpec {
                    flops,
                    memory_bw,
                    memory_size,
                    icn_bw,
                    real_values: true,
                }),
                _ => Err(SweepError::InvalidRequest(
                    "custom system needs --flops, --mem-bw, --mem-cap and --icn-bw".into(),
                )),
            };
        }

        let preset = SystemPreset::from_name(&self.system)
            .ok_or_else(|| SweepError::UnknownSystem(self.system.clone()))?;
        let base = preset.spec();
        Ok(HardwareSpec {
            flops: self.flops.unwrap_or(base.flops),
            memory_bw: self.mem_bw.unwrap_or(base.memory_bw),
            memory_size: self.mem_cap.unwrap_or(base.memory_size),
            icn_bw: self.icn_bw.unwrap_or(base.icn_bw),
            real_values: true,
        })
    }

    pub fn policy(&self) -> FallbackPolicy {
        if self.legacy_fallback {
            FallbackPolicy::Conflate
        } else {
            FallbackPolicy::CapacityOnly
        }
    }
}

/// Format milliseconds as human-readable string.
pub fn format_ms(ms: f64) -> String {
    if ms >= 1_000.0 {
        format!("{:.2} s", ms / 1e3)
    } else if ms >= 1.0 {
        format!("{:.2} ms", ms)
    } else {
        format!("{:.1} us", ms * 1e3)
    }
}

/// Format tokens per second.
pub fn format_tps(tps: f64) -> String {
    if tps >= 1_000_000.0 {
        format!("{:.2}M tok/s", tps / 1e6)
    } else if tps >= 1000.0 {
        format!("{:.1}K tok/s", tps / 1000.0)
    } else {
        format!("{:.1} tok/s", tps)
    }
}

/// Format megabytes, switching to GB above 1024.
pub fn format_mb(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{:.0} MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["tokensweep"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_dashboard() {
        let cli = parse(&[]);
        let req = cli.to_request().unwrap();
        assert_eq!(req.models, vec![DEFAULT_MODEL.to_string()]);
        assert_eq!(req.quantization, Quantization::Bf16);
        assert_eq!(req.max_batch, 8);
        assert_eq!(req.nodes, 2);
        assert_eq!(req.efficiency, 0.80);
        assert_eq!((req.beam_size, req.input_tokens, req.output_tokens), (4, 1000, 200));
        assert_eq!(req.hardware, SystemPreset::A100_40GB.spec());
        assert_eq!(cli.policy(), FallbackPolicy::CapacityOnly);
    }

    #[test]
    fn test_models_keep_selection_order() {
        let cli = parse(&["-m", "google/gemma-7B", "--model", "meta-llama/Llama-2-13B"]);
        assert_eq!(cli.models, vec!["google/gemma-7B", "meta-llama/Llama-2-13B"]);
    }

    #[test]
    fn test_use_case_and_overrides() {
        let cli = parse(&["--use-case", "chatbot", "--beam", "1", "--quantization", "int4"]);
        let req = cli.to_request().unwrap();
        assert_eq!((req.beam_size, req.input_tokens, req.output_tokens), (1, 2048, 128));
        assert_eq!(req.quantization, Quantization::Int4);
    }

    #[test]
    fn test_beam_range_enforced() {
        assert!(Cli::try_parse_from(["tokensweep", "--beam", "17"]).is_err());
        assert!(Cli::try_parse_from(["tokensweep", "--beam", "0"]).is_err());
        assert!(Cli::try_parse_from(["tokensweep", "--nodes", "0"]).is_err());
    }

    #[test]
    fn test_hardware_overrides() {
        let cli = parse(&["--system", "h100_gpu", "--mem-cap", "96"]);
        let hw = cli.hardware().unwrap();
        assert_eq!(hw.memory_size, 96.0);
        assert_eq!(hw.flops, SystemPreset::H100.spec().flops);
    }

    #[test]
    fn test_custom_system_needs_all_figures() {
        let partial = parse(&["--system", "custom", "--flops", "100"]);
        assert!(matches!(partial.hardware(), Err(SweepError::InvalidRequest(_))));

        let full = parse(&[
            "--system", "custom", "--flops", "100", "--mem-bw", "1", "--mem-cap", "24", "--icn-bw", "32",
        ]);
        let hw = full.hardware().unwrap();
        assert_eq!(hw.memory_mb(), 24_576.0);
    }

    #[test]
    fn test_unknown_system() {
        let cli = parse(&["--system", "abacus"]);
        assert!(matches!(cli.to_request(), Err(SweepError::UnknownSystem(_))));
    }

    #[test]
    fn test_legacy_flag() {
        assert_eq!(parse(&["--legacy-fallback"]).policy(), FallbackPolicy::Conflate);
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_ms(2500.0), "2.50 s");
        assert_eq!(format_ms(12.345), "12.35 ms");
        assert_eq!(format_ms(0.25), "250.0 us");
        assert_eq!(format_tps(1500.0), "1.5K tok/s");
        assert_eq!(format_tps(42.0), "42.0 tok/s");
        assert_eq!(format_mb(81_920.0), "80.0 GB");
        assert_eq!(format_mb(512.0), "512 MB");
    }
}
