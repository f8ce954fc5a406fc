use std::time::Duration;

use crate::common::Cycle;
use crate::errors::SimError;

pub const DEFAULT_MEMORY_SIZE: usize = 8192;
pub const DEFAULT_MAX_CYCLES: Cycle = 2_000_000;
pub const DEFAULT_RUN_DELAY_MS: u64 = 10;
pub const DEFAULT_LOG_SPEC: &str = "warn";

/// Sizing and pacing knobs for a `System`. Preserved across resets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Capacity of data memory in bytes, must be a non-zero multiple of 4
    pub memory_size: usize,
    /// Safety ceiling, the simulation halts once this many cycles have run
    pub max_cycles: Cycle,
    /// Delay between cycles in continuous run mode
    pub run_delay: Duration,
    /// `flexi_logger` spec used by the front end
    pub log_spec: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_cycles: DEFAULT_MAX_CYCLES,
            run_delay: Duration::from_millis(DEFAULT_RUN_DELAY_MS),
            log_spec: DEFAULT_LOG_SPEC.to_string(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.memory_size == 0 {
            return Err(SimError::InvalidConfig(
                "memory size must be non-zero".to_string(),
            ));
        }
        if self.memory_size % 4 != 0 {
            return Err(SimError::InvalidConfig(format!(
                "memory size {} is not a multiple of 4 bytes",
                self.memory_size
            )));
        }
        Ok(())
    }
}
