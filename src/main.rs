//! LLM serving comparison
//!
//! Sweeps batch sizes for the selected models on one hardware system and
//! prints prefill/decode throughput, or the minimum chip counts when nothing
//! fits.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{format_mb, format_ms, format_tps, Cli, OutputFormat};
use tokensweep::error::SweepError;
use tokensweep::models::MODELS;
use tokensweep::report::{Facet, SweepIssue};
use tokensweep::{
    AnalyticEstimator, Chart, Phase, Sweep, SweepOutcome, SweepReport, SweepRequest, SystemPreset,
};

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if args.list_models {
        list_models();
        return ExitCode::SUCCESS;
    }

    if args.list_systems {
        list_systems();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "sweep failed");
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tokensweep=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Cli) -> tokensweep::Result<()> {
    let request = args.to_request()?;
    let sweep = Sweep::new(AnalyticEstimator::default()).with_policy(args.policy());
    let report = sweep.run(&request)?;

    match args.format {
        OutputFormat::Table => print_table(&request, &report),
        OutputFormat::Csv => print_csv(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    match report.outcome() {
        SweepOutcome::NothingEstimated(issues) => Err(SweepError::NothingEstimated {
            rejected: issues.len(),
        }),
        _ => Ok(()),
    }
}

fn print_table(request: &SweepRequest, report: &SweepReport) {
    println!("=== LLM Serving Comparison ===\n");

    println!("Configuration:");
    println!("  Models:        {}", request.models.join(", "));
    println!("  Precision:     {}", request.quantization.name());
    println!("  Nodes:         {}", request.nodes);
    println!("  Efficiency:    {:.0}%", request.efficiency * 100.0);
    println!("  Memory/device: {}", format_mb(request.hardware.memory_mb()));
    println!(
        "  Workload:      beam={} input={} output={}",
        request.beam_size, request.input_tokens, request.output_tokens
    );
    println!("  Max batch:     {}", request.max_batch);
    println!();

    match report.outcome() {
        SweepOutcome::Chart(chart) => {
            print_performance(report);
            print_chart(&chart);
            if !report.capacity.is_empty() {
                println!("--- Configurations That Did Not Fit ---");
                print_capacity(report);
            }
        }
        SweepOutcome::CapacityShortfall(_) => {
            println!("Number of nodes is insufficient, please increase the nodes to fit the model\n");
            print_capacity(report);
        }
        SweepOutcome::NothingEstimated(_) => {
            println!("No configuration could be estimated; check the model names and hardware figures\n");
        }
    }

    if !report.rejected.is_empty() {
        print_rejected(&report.rejected);
    }
}

fn print_rejected(issues: &[SweepIssue]) {
    println!("--- Rejected Configurations ---");
    for issue in issues {
        println!("  {:<36} batch={:<4} {}", issue.model, issue.batch, issue.error);
    }
    println!();
}

fn print_performance(report: &SweepReport) {
    println!("--- Performance ---");
    println!(
        "{:<36} {:>8} {:>6} {:>12} {:>16} {:>12} {:>12} {:>12}",
        "Model", "Stage", "Batch", "Latency", "Throughput", "GEMM", "Attn", "Comm"
    );
    for row in report.performance_by_phase() {
        println!(
            "{:<36} {:>8} {:>6} {:>12} {:>16} {:>12} {:>12} {:>12}",
            row.model,
            row.phase.name(),
            row.batch,
            format_ms(row.latency_ms),
            format_tps(row.tokens_per_s),
            format_ms(row.gemm_ms),
            format_ms(row.attn_ms),
            format_ms(row.comm_ms)
        );
    }
    println!();
}

fn print_chart(chart: &Chart) {
    for phase in Phase::ORDER {
        if let Some(facet) = chart.facet(phase) {
            print_facet(facet);
        }
    }
}

fn print_facet(facet: &Facet) {
    println!("--- {} ({} vs {}) ---", facet.phase, Chart::Y_LABEL, Chart::X_LABEL);
    let Some((_, hi)) = facet.y_range else {
        println!("  (no data)\n");
        return;
    };

    const WIDTH: f64 = 40.0;
    for series in &facet.series {
        println!("  {}", series.model);
        for point in &series.points {
            let bar = if hi > 0.0 {
                ((point.tokens_per_s / hi) * WIDTH).round() as usize
            } else {
                0
            };
            println!(
                "    {:>4} | {:<40} {}",
                point.batch,
                "#".repeat(bar),
                format_tps(point.tokens_per_s)
            );
        }
    }
    println!();
}

fn print_capacity(report: &SweepReport) {
    println!(
        "{:<36} {:>12} {:>6} {:>6} {:>8} {:>8} {:>12} {:>10}",
        "Model", "NPU memory", "Batch", "Beam", "Input", "Output", "Required", "Min. Chips"
    );
    for row in &report.capacity {
        println!(
            "{:<36} {:>12} {:>6} {:>6} {:>8} {:>8} {:>12} {:>10}",
            row.model,
            format_mb(row.memory_mb),
            row.batch,
            row.beam_size,
            row.input_tokens,
            row.output_tokens,
            format_mb(row.required_mb),
            row.min_chips
        );
    }
    println!();
}

fn print_csv(report: &SweepReport) {
    if !report.performance.is_empty() {
        print!("{}", report.performance_csv());
    }
    if !report.capacity.is_empty() {
        if !report.performance.is_empty() {
            println!();
        }
        print!("{}", report.capacity_csv());
    }
}

fn list_models() {
    println!("{:<40} {:>8} {:>8} {:>10}", "Model", "Layers", "Hidden", "Params");
    for model in MODELS.iter() {
        println!(
            "{:<40} {:>8} {:>8} {:>9.2}B",
            model.id,
            model.num_layers,
            model.hidden_size,
            model.total_params() as f64 / 1e9
        );
    }
}

fn list_systems() {
    println!(
        "{:<16} {:>10} {:>10} {:>10} {:>10}",
        "System", "TFLOPS", "TB/s", "GB", "ICN GB/s"
    );
    for preset in SystemPreset::ALL {
        let spec = preset.spec();
        println!(
            "{:<16} {:>10.0} {:>10.3} {:>10.0} {:>10.0}",
            preset.name(),
            spec.flops,
            spec.memory_bw,
            spec.memory_size,
            spec.icn_bw
        );
    }
}
