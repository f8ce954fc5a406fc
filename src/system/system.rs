use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use crate::common::{Cycle, PipelineStage};
use crate::config::SimConfig;
use crate::errors::{Diagnostic, SimError};
use crate::execution::execution_state::{ExecutionMode, ExecutionState};
use crate::memory::memory_system::Memory;
use crate::pipeline::instruction::InstructionRecord;
use crate::pipeline::pipeline::PipelineState;
use crate::program::program_store::Program;
use crate::register::register_system::RegisterSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessage {
    Continue,
    Halt,
}

/// The pipeline engine. Owns the register file, data memory, program and
/// stage latches of one simulated processor
#[derive(Debug)]
pub struct System {
    pub clock: Cycle,
    pub(crate) config: SimConfig,
    pub(crate) registers: RegisterSet,
    pub(crate) memory_system: Memory,
    pub(crate) program: Program,
    pub(crate) pipeline: PipelineState,
    pub(crate) program_counter: usize,
    // remainder of the last DIV/DIVU, read by MFHI
    pub(crate) hi: u32,
    pub(crate) current_line: Option<usize>,
    pub(crate) execution_state: ExecutionState,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Default for System {
    fn default() -> Self {
        Self::build(SimConfig::default())
    }
}

impl System {
    /// Creates a new system, rejecting an invalid configuration
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let execution_state = ExecutionState::new(ExecutionMode::Idle, config.run_delay);
        Self {
            clock: 0,
            memory_system: Memory::new(config.memory_size),
            registers: RegisterSet::new(),
            program: Program::default(),
            pipeline: PipelineState::new(),
            program_counter: 0,
            hi: 0,
            current_line: None,
            execution_state,
            running: Arc::new(AtomicBool::new(false)),
            diagnostics: Vec::new(),
            config,
        }
    }

    /// Replaces the program and clears any in flight instructions. Registers
    /// and memory are left alone
    pub fn load_program<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.program = Program::from_lines(lines);
        self.reset_pipeline();
    }

    pub fn load_source(&mut self, source: &str) {
        self.program = Program::from_source(source);
        self.reset_pipeline();
    }

    /// Zeroes registers and memory, clears the latches and the program counter
    pub fn reset(&mut self) {
        info!("Resetting system");
        self.running.store(false, Ordering::SeqCst);
        self.reset_pipeline();
        self.registers.reset();
        self.memory_system.reset();
        self.diagnostics.clear();
    }

    /// Clears pipeline state only: latches, program counter, high register
    /// and the cycle count
    pub(crate) fn reset_pipeline(&mut self) {
        self.pipeline.reset();
        self.program_counter = 0;
        self.hi = 0;
        self.clock = 0;
        self.current_line = None;
        self.execution_state.mode = ExecutionMode::Idle;
    }

    fn halt(&mut self) {
        self.pipeline.reset();
        self.program_counter = 0;
        self.hi = 0;
        self.running.store(false, Ordering::SeqCst);
        self.execution_state.mode = ExecutionMode::Halted;
    }

    /// Runs one clock cycle. Stages are evaluated from write back to fetch,
    /// so no stage sees a latch that an earlier stage already overwrote in the
    /// same cycle
    pub fn advance_cycle(&mut self) -> SystemMessage {
        if self.execution_state.mode == ExecutionMode::Halted {
            return SystemMessage::Halt;
        }
        if self.clock >= self.config.max_cycles {
            warn!(
                "Safety ceiling of {} cycles reached, halting",
                self.config.max_cycles
            );
            self.halt();
            return SystemMessage::Halt;
        }
        if self.program_counter >= self.program.len() && self.pipeline.is_empty() {
            info!("Program complete after {} cycles", self.clock);
            self.halt();
            return SystemMessage::Halt;
        }

        info!(
            "Starting cycle {}, PC: {}",
            self.clock, self.program_counter
        );
        self.pipeline_write_back();
        self.pipeline_memory();
        self.pipeline_execute();
        self.pipeline_decode();
        self.pipeline_fetch();
        self.clock += 1;

        SystemMessage::Continue
    }

    /// Logs and records a recoverable error raised by `stage`
    pub(crate) fn report(&mut self, stage: PipelineStage, error: SimError) {
        if let SimError::ImmediateOverflow { .. } = error {
            warn!("Pipeline::{stage}: {error}");
        } else {
            error!("Pipeline::{stage}: {error}");
        }
        self.diagnostics.push(Diagnostic {
            clock: self.clock,
            stage,
            error,
        });
    }

    /// Reads a register on behalf of `stage`, invalid indices read as 0
    pub(crate) fn register_value(&mut self, stage: PipelineStage, num: usize) -> u32 {
        match self.registers.try_read(num) {
            Ok(val) => val,
            Err(e) => {
                self.report(stage, e);
                0
            }
        }
    }

    pub fn read_register(&mut self, num: usize) -> u32 {
        self.register_value(PipelineStage::System, num)
    }

    pub fn write_register(&mut self, num: usize, data: u32) {
        if let Err(e) = self.registers.try_write(num, data) {
            self.report(PipelineStage::System, e);
        }
    }

    pub fn read_word(&self, address: i64) -> Result<u32, SimError> {
        self.memory_system.read_word(address)
    }

    pub fn write_word(&mut self, address: i64, data: u32) -> Result<(), SimError> {
        self.memory_system.write_word(address, data)
    }

    /// Saves registers and memory as the baseline for `restore`
    pub fn snapshot(&mut self) {
        info!("Saving register and memory baseline");
        self.registers.snapshot_as_baseline();
        self.memory_system.snapshot_as_baseline();
    }

    pub fn restore(&mut self) {
        info!("Restoring register and memory baseline");
        self.registers.restore_from_baseline();
        self.memory_system.restore_from_baseline();
    }

    /// Drains the recorded diagnostics
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory_system
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    /// Source line of the most recently fetched instruction
    pub fn current_line(&self) -> Option<usize> {
        self.current_line
    }

    pub fn mode(&self) -> ExecutionMode {
        self.execution_state.mode
    }

    /// Latch contents in pipeline order, fetch output first
    pub fn latches(&self) -> [&InstructionRecord; 4] {
        self.pipeline.latches()
    }
}

impl Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [fetch, decode, execute, memory] = self.latches();
        writeln!(
            f,
            "Clock: {}  PC: {:04X}  Mode: {}",
            self.clock, self.program_counter, self.execution_state.mode
        )?;
        writeln!(f, "Fetch:     {fetch}")?;
        writeln!(f, "Decode:    {decode}")?;
        writeln!(f, "Execute:   {execute}")?;
        write!(f, "Memory:    {memory}")
    }
}

#[cfg(test)]
mod test {
    use super::{System, SystemMessage};
    use crate::common::PipelineStage;
    use crate::config::SimConfig;
    use crate::errors::SimError;
    use crate::execution::execution_state::ExecutionMode;

    fn run_to_halt(system: &mut System) {
        while system.advance_cycle() == SystemMessage::Continue {}
    }

    fn run_program(lines: &[&str]) -> System {
        let mut system = System::default();
        system.load_program(lines);
        run_to_halt(&mut system);
        system
    }

    #[test]
    fn add_program() {
        let mut system = run_program(&["ADDI $1, $0, 5", "ADDI $2, $0, 3", "ADD $3, $1, $2"]);
        assert_eq!(system.mode(), ExecutionMode::Halted);
        assert_eq!(system.read_register(1), 5);
        assert_eq!(system.read_register(2), 3);
        assert_eq!(system.read_register(3), 8);
        assert!(system.take_diagnostics().is_empty());
    }

    #[test]
    fn taken_branch_skips_line() {
        let mut system = run_program(&[
            "ADDI $1, $0, 0",
            "BEQ $1, $0, 2",
            "ADDI $2, $0, 99",
            "ADDI $3, $0, 1",
        ]);
        assert_eq!(system.read_register(2), 0);
        assert_eq!(system.read_register(3), 1);
    }

    #[test]
    fn untaken_branch_falls_through() {
        let mut system = run_program(&[
            "ADDI $1, $0, 1",
            "BEQ $1, $0, 2",
            "ADDI $2, $0, 99",
            "ADDI $3, $0, 1",
        ]);
        assert_eq!(system.read_register(2), 0x99);
        assert_eq!(system.read_register(3), 1);
    }

    #[test]
    fn bne_loop_counts_down() {
        let mut system = run_program(&[
            "ADDI $1, $0, 5",    // counter
            "ADDI $2, $2, 2",    // accumulate
            "SUBI $1, $1, 1",
            "BNE $1, $0, FFFE", // back to the accumulate line
            "ADD $3, $2, $0",
        ]);
        assert_eq!(system.read_register(1), 0);
        assert_eq!(system.read_register(2), 10);
        assert_eq!(system.read_register(3), 10);
    }

    #[test]
    fn comparand_sees_same_cycle_write_back() {
        // the branch decodes in the cycle its last source is written back
        let mut system = run_program(&[
            "ADDI $1, $0, 7",
            "ADDI $2, $0, 7",
            "BEQ $1, $2, 2",
            "ADDI $3, $0, 1",
            "ADDI $4, $0, 1",
        ]);
        assert_eq!(system.read_register(3), 0);
        assert_eq!(system.read_register(4), 1);
    }

    #[test]
    fn self_branch_hits_safety_ceiling() {
        let config = SimConfig {
            max_cycles: 5_000,
            ..SimConfig::default()
        };
        let mut system = System::new(config).unwrap();
        system.load_program(["BEQ $0, $0, 0"]);
        let mut cycles = 0;
        while system.advance_cycle() == SystemMessage::Continue {
            cycles += 1;
            assert!(cycles <= 5_000, "ceiling not enforced");
        }
        assert_eq!(cycles, 5_000);
        assert_eq!(system.mode(), ExecutionMode::Halted);
        assert!(system.latches().iter().all(|rec| rec.is_nop()));
        assert_eq!(system.program_counter(), 0);
    }

    #[test]
    fn load_and_store() {
        let mut system = System::default();
        system.write_word(0x20, 0x1234_5678).unwrap();
        system.load_program([
            "LI $1, 10",     // 0x10 base
            "LW $2, 10($1)", // 0x20
            "SW $2, 5($1)",  // unaligned 0x15
            "LW $3, 5($1)",
        ]);
        run_to_halt(&mut system);
        assert_eq!(system.read_register(2), 0x1234_5678);
        assert_eq!(system.read_word(0x15).unwrap(), 0x1234_5678);
        assert_eq!(system.read_register(3), 0x1234_5678);
    }

    #[test]
    fn load_out_of_bounds_reports_and_yields_zero() {
        let mut system = System::default();
        system.write_register(5, 9);
        system.load_program(["LW $5, FFFC($0)", "SW $0, 2000($0)"]);
        run_to_halt(&mut system);
        assert_eq!(system.read_register(5), 0);
        let errors: Vec<SimError> = system
            .take_diagnostics()
            .into_iter()
            .map(|d| d.error)
            .collect();
        assert_eq!(
            errors,
            vec![
                SimError::MemoryOutOfBounds {
                    address: -4,
                    capacity: 8192
                },
                SimError::MemoryOutOfBounds {
                    address: 0x2000,
                    capacity: 8192
                },
            ]
        );
    }

    #[test]
    fn invalid_register_is_reported() {
        let mut system = run_program(&["ADD $1, $40, $0", "ADDI $33, $0, 1"]);
        assert_eq!(system.read_register(1), 0);
        let diagnostics = system.take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].stage, PipelineStage::Decode);
        assert_eq!(diagnostics[0].error, SimError::InvalidRegisterIndex(40));
        assert_eq!(diagnostics[1].stage, PipelineStage::WriteBack);
        assert_eq!(diagnostics[1].error, SimError::InvalidRegisterIndex(33));
    }

    #[test]
    fn empty_and_blank_programs_halt() {
        let mut system = System::default();
        assert_eq!(system.advance_cycle(), SystemMessage::Halt);

        let system = run_program(&["", "   # nothing here", ""]);
        assert_eq!(system.mode(), ExecutionMode::Halted);
        assert_eq!(system.registers().values(), &[0; 32]);
    }

    #[test]
    fn unknown_opcodes_are_noops() {
        let mut system = run_program(&["JAL $1, 4", "FOO", "ADDI $2, $0, 1"]);
        assert_eq!(system.read_register(1), 0);
        assert_eq!(system.read_register(2), 1);
    }

    #[test]
    fn halted_system_stays_halted() {
        let mut system = run_program(&["ADDI $1, $0, 1"]);
        assert_eq!(system.advance_cycle(), SystemMessage::Halt);
        assert_eq!(system.read_register(1), 1);
    }

    #[test]
    fn reset_twice_matches_once() {
        let mut system = run_program(&["ADDI $1, $0, 1", "SW $1, 0($0)"]);
        system.reset();
        let regs = system.registers().clone();
        let mem = system.memory().clone();
        system.reset();
        assert_eq!(system.registers(), &regs);
        assert_eq!(system.memory(), &mem);
        assert_eq!(system.read_register(1), 0);
        assert_eq!(system.read_word(0).unwrap(), 0);
        assert_eq!(system.mode(), ExecutionMode::Idle);
        assert_eq!(system.clock, 0);
    }

    #[test]
    fn snapshot_and_restore() {
        let mut system = System::default();
        system.write_register(4, 44);
        system.write_word(8, 88).unwrap();
        system.snapshot();
        system.reset();
        assert_eq!(system.read_register(4), 0);
        system.restore();
        assert_eq!(system.read_register(4), 44);
        assert_eq!(system.read_word(8).unwrap(), 88);
    }

    #[test]
    fn direct_register_zero_write_is_ignored() {
        let mut system = System::default();
        system.write_register(0, 123);
        assert_eq!(system.read_register(0), 0);
        system.write_register(32, 1);
        assert_eq!(
            system.take_diagnostics()[0].error,
            SimError::InvalidRegisterIndex(32)
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            memory_size: 10,
            ..SimConfig::default()
        };
        assert!(System::new(config).is_err());
    }

    #[test]
    fn displays_latches() {
        let mut system = System::default();
        system.load_program(["ADDI $1, $0, 1"]);
        system.advance_cycle();
        let shown = system.to_string();
        assert!(shown.contains("Fetch:     ADDI $1, $0, 1"));
        assert!(shown.contains("Decode:    NOP"));
    }
}
