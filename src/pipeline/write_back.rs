use log::{info, warn};

use crate::common::PipelineStage;
use crate::pipeline::instruction::Operand;
use crate::system::system::System;

impl System {
    /// Retires the memory latch, committing its result to `rd`
    pub(crate) fn pipeline_write_back(&mut self) {
        let instr = std::mem::take(&mut self.pipeline.memory);
        if !instr.opcode.writes_register() {
            return;
        }

        let data = instr.result.unwrap_or(0);
        match instr.rd {
            Operand::Register(num) => match self.registers.try_write(num, data) {
                Ok(()) => info!("Pipeline::WriteBack: Wrote {data:#010X} to ${num}"),
                Err(e) => self.report(PipelineStage::WriteBack, e),
            },
            Operand::Value(_) => {
                warn!("Pipeline::WriteBack: {instr} has no destination register, discarding result");
            }
        }
    }
}
