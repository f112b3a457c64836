//! Error types for estimation and sweeps.
//!
//! [`EstimateError`] is what an [`Estimator`](crate::estimator::Estimator)
//! returns; the sweep driver branches on its variants instead of treating
//! every failure as a capacity shortfall. [`SweepError`] covers everything
//! that stops a sweep from starting (bad request, unreadable config).

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for request loading and sweep entry points.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Typed outcome of a failed estimator call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    /// The model (weights + KV cache) does not fit the requested devices.
    #[error("{model} needs {required_mb:.0} MB per device, only {available_mb:.0} MB available")]
    CapacityExceeded {
        /// Model identifier
        model: String,
        /// Memory needed per device in MB
        required_mb: f64,
        /// Memory available per device in MB
        available_mb: f64,
    },

    /// Model id not present in the catalog
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Hardware, parallelism or workload figures the estimator cannot use
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl EstimateError {
    /// True when the failure means "does not fit", as opposed to bad input.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

/// Errors that prevent a sweep from running or from producing anything.
#[derive(Debug, Error)]
pub enum SweepError {
    /// No models selected; the sweep is not run at all.
    #[error("no models selected")]
    EmptySelection,

    /// A request field is out of range
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Batch ladder is empty, contains zero, or is not strictly increasing
    #[error("invalid batch ladder: {0}")]
    InvalidLadder(String),

    /// Hardware preset name not in the catalog
    #[error("unknown system: {0}")]
    UnknownSystem(String),

    /// Request file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Request file or output could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sweep ran but the estimator rejected every pair
    #[error("no configuration could be estimated ({rejected} rejected)")]
    NothingEstimated {
        /// Number of rejected pairs
        rejected: usize,
    },
}

impl SweepError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::EmptySelection => ExitCode::from(2),
            Self::InvalidRequest(_) | Self::InvalidLadder(_) => ExitCode::from(3),
            Self::UnknownSystem(_) => ExitCode::from(4),
            Self::Io { .. } => ExitCode::from(5),
            Self::Json(_) => ExitCode::from(6),
            Self::NothingEstimated { .. } => ExitCode::from(7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_variant_is_classified() {
        let err = EstimateError::CapacityExceeded {
            model: "m".to_string(),
            required_mb: 100.0,
            available_mb: 50.0,
        };
        assert!(err.is_capacity());
        assert!(!EstimateError::UnknownModel("x".into()).is_capacity());
        assert!(!EstimateError::InvalidConfiguration("x".into()).is_capacity());
    }

    #[test]
    fn messages_name_the_problem() {
        let err = EstimateError::CapacityExceeded {
            model: "meta-llama/Llama-2-70B".to_string(),
            required_mb: 140_000.0,
            available_mb: 40_960.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Llama-2-70B"));
        assert!(msg.contains("140000"));
        assert!(msg.contains("40960"));

        assert_eq!(SweepError::EmptySelection.to_string(), "no models selected");
        assert_eq!(
            SweepError::NothingEstimated { rejected: 4 }.to_string(),
            "no configuration could be estimated (4 rejected)"
        );
    }
}
