//! LLM serving comparison across hardware.
//!
//! Sweeps a fixed ladder of batch sizes for a set of models and asks a
//! performance [`Estimator`] for prefill and decode timing at each point.
//! Configurations that do not fit the requested devices fall back to a
//! minimum-chip-count estimate. The result is a [`SweepReport`] holding both
//! tables, with a phase-faceted throughput [`Chart`] view on top.
//!
//! ```text
//! SweepRequest ──▶ Sweep (ladder x models) ──▶ Estimator
//!                        │                        │ estimate / profile
//!                        ▼                        ▼
//!                  SweepReport { performance, capacity, rejected }
//!                        │
//!                        ▼
//!             outcome(): Chart | CapacityShortfall
//! ```

pub mod analytic;
pub mod error;
pub mod estimator;
pub mod hardware;
pub mod models;
pub mod report;
pub mod sweep;
pub mod usecase;


pub use analytic::AnalyticEstimator;
pub use error::{EstimateError, Result, SweepError};
pub use estimator::{Estimate, EstimateQuery, Estimator, MemoryProfile, Phase, RuntimeBreakdown};
pub use hardware::{HardwareSpec, SystemPreset};
pub use models::{ModelConfig, Quantization};
pub use report::{CapacitySample, Chart, FallbackCause, PerformanceSample, SweepOutcome, SweepReport};
pub use sweep::{sweep, BatchLadder, FallbackPolicy, Sweep, SweepRequest, STANDARD_LADDER};
pub use usecase::{UsageProfile, UseCase};
