use thiserror::Error;

use crate::common::{Cycle, PipelineStage};

/// Recoverable conditions raised while simulating. None of these stop the
/// simulation; the offending operation degrades to a safe default instead
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("Invalid register index: {0}")]
    InvalidRegisterIndex(usize),

    #[error("Memory address {address} is out of bounds, memory holds {capacity} bytes")]
    MemoryOutOfBounds { address: i64, capacity: usize },

    #[error("Word operation at address {address} would exceed memory bounds of {capacity} bytes")]
    UnalignedOversizeAccess { address: i64, capacity: usize },

    #[error("Division by zero attempted, ignoring instruction")]
    DivisionByZero,

    #[error("Immediate value '{original}' exceeds 16 bits. Truncated to '{truncated}'")]
    ImmediateOverflow { original: String, truncated: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A `SimError` tagged with where and when it was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub clock: Cycle,
    pub stage: PipelineStage,
    pub error: SimError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[cycle {}, {}] {}", self.clock, self.stage, self.error)
    }
}
