//! Error taxonomy for a simulation run.
//!
//! Configuration and input problems are caught eagerly, before any grid is
//! registered. Engine and numeric failures abort a run mid-loop; everything
//! registered by already-completed steps stays valid.

use thiserror::Error;

/// Failure raised by a [`crate::engine::GridEngine`] operation.
#[derive(Debug, Error)]
#[error("grid engine `{operation}` failed: {message}")]
pub struct EngineError {
    pub operation: &'static str,
    pub message: String,
}

impl EngineError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// A numeric kernel produced a non-finite or otherwise invalid result.
#[derive(Debug, Error)]
#[error("numeric kernel `{quantity}` invalid: {message}")]
pub struct NumericError {
    pub quantity: &'static str,
    pub message: String,
}

impl NumericError {
    pub fn new(quantity: &'static str, message: impl Into<String>) -> Self {
        Self {
            quantity,
            message: message.into(),
        }
    }
}

/// Failure inside a single evolution step, before the orchestrator attaches
/// the step index.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

impl StepError {
    /// Attach the 1-based step index at which this failure occurred.
    pub fn at_step(self, step: usize) -> EvolutionError {
        match self {
            StepError::Engine(source) => EvolutionError::DelegatedEngine { step, source },
            StepError::Numeric(source) => EvolutionError::Numeric { step, source },
        }
    }
}

/// Top-level error type for the evolution engine.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Invalid mode/runs combination or a bad coefficient value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed precipitation record, non-monotonic timestamps, or other
    /// bad external input.
    #[error("input error: {0}")]
    Input(String),

    /// A delegated grid-engine call failed during step `step`.
    #[error("step {step}: {source}")]
    DelegatedEngine {
        step: usize,
        #[source]
        source: EngineError,
    },

    /// A numeric kernel failed during step `step`.
    #[error("step {step}: {source}")]
    Numeric {
        step: usize,
        #[source]
        source: NumericError,
    },
}

pub type Result<T, E = EvolutionError> = std::result::Result<T, E>;
