use std::time::Duration;

use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Default, Display, EnumIter)]
pub enum ExecutionMode {
    #[default]
    Idle,
    Running,
    #[strum(serialize = "Stepping")]
    SteppingOnce,
    Halted,
}

/// Holds information regarding how we're executing the given system that
/// isn't a necessary part of the system (e.g. single step vs. continuous
/// execution, the pacing of a run)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionState {
    pub mode: ExecutionMode,
    /// Delay between cycles of a continuous run
    pub speed: Duration,
}

impl ExecutionState {
    pub fn new(mode: ExecutionMode, speed: Duration) -> Self {
        Self { mode, speed }
    }
}
