use crate::pipeline::instruction::InstructionRecord;

/// The four stage latches sitting between fetch/decode, decode/execute,
/// execute/memory and memory/write back. A latch with nothing in it holds
/// the no-operation sentinel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub fetch: InstructionRecord,
    pub decode: InstructionRecord,
    pub execute: InstructionRecord,
    pub memory: InstructionRecord,
    // decode is holding the fetched instruction this cycle, fetch must not advance
    pub stalled: bool,
}

impl PipelineState {
    pub fn new() -> Self {
        PipelineState::default()
    }

    pub fn reset(&mut self) {
        *self = PipelineState::new();
    }

    /// True once every latch holds the sentinel
    pub fn is_empty(&self) -> bool {
        self.latches().iter().all(|rec| rec.is_nop())
    }

    /// Indicates whether general register `num` is the destination of an
    /// instruction that has not been written back yet
    pub fn is_pending(&self, num: usize) -> bool {
        self.execute.writes_register(num) || self.memory.writes_register(num)
    }

    /// Latches in pipeline order, fetch output first
    pub fn latches(&self) -> [&InstructionRecord; 4] {
        [&self.fetch, &self.decode, &self.execute, &self.memory]
    }
}
