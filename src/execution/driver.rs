use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::execution::execution_state::ExecutionMode;
use crate::system::system::{System, SystemMessage};

/// Cancels a continuous run from outside the task driving it
#[derive(Debug, Clone)]
pub struct RunHandle {
    running: Arc<AtomicBool>,
}

impl RunHandle {
    /// Requests the run to stop. Takes effect before the next cycle
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl System {
    /// Advances a single cycle, returning the line most recently fetched.
    /// Returns `None` once the program has halted
    pub fn step_once(&mut self) -> Option<usize> {
        if self.execution_state.mode != ExecutionMode::Halted {
            self.execution_state.mode = ExecutionMode::SteppingOnce;
        }
        match self.advance_cycle() {
            SystemMessage::Continue => self.current_line,
            SystemMessage::Halt => None,
        }
    }

    /// Runs from the first line with `delay` between cycles until the program
    /// halts or the run is stopped through a `RunHandle`. The pipeline is
    /// cleared first, registers and memory are kept
    pub async fn run(&mut self, delay: Duration) -> ExecutionMode {
        self.reset_pipeline();
        self.execution_state.mode = ExecutionMode::Running;
        self.execution_state.speed = delay;
        self.running.store(true, Ordering::SeqCst);
        info!("Starting continuous run, {}ms per cycle", delay.as_millis());

        loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("Run cancelled after {} cycles", self.clock);
                self.stop();
                break;
            }
            if self.advance_cycle() == SystemMessage::Halt {
                break;
            }
            tokio::time::sleep(delay).await;
        }

        self.execution_state.mode
    }

    pub fn run_handle(&self) -> RunHandle {
        RunHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Ends any run and clears the pipeline, registers and memory are kept
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.reset_pipeline();
    }
}
