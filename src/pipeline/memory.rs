use log::{info, warn};

use crate::common::PipelineStage;
use crate::pipeline::instruction::Opcode;
use crate::system::system::System;

impl System {
    /// Performs the data memory access for loads and stores, everything else
    /// passes through untouched
    pub(crate) fn pipeline_memory(&mut self) {
        let mut instr = std::mem::take(&mut self.pipeline.execute);

        match (&instr.opcode, instr.memory_address) {
            (Opcode::Lw, Some(address)) => {
                let data = match self.memory_system.read_word(address) {
                    Ok(data) => data,
                    Err(e) => {
                        self.report(PipelineStage::Memory, e);
                        0
                    }
                };
                info!("Pipeline::Memory: Loaded {data:#010X} from {address:#06X}");
                instr.result = Some(data);
            }
            (Opcode::Sw, Some(address)) => {
                let data = instr.result.unwrap_or(0);
                match self.memory_system.write_word(address, data) {
                    Ok(()) => info!("Pipeline::Memory: Stored {data:#010X} to {address:#06X}"),
                    Err(e) => self.report(PipelineStage::Memory, e),
                }
            }
            (Opcode::Lw | Opcode::Sw, None) => {
                warn!("Pipeline::Memory: {instr} has no effective address, skipping access");
            }
            _ => {}
        }

        self.pipeline.memory = instr;
    }
}

#[cfg(test)]
mod test {
    use crate::errors::SimError;
    use crate::pipeline::instruction::{InstructionRecord, Opcode};
    use crate::system::system::System;

    #[test]
    fn store_then_load() {
        let mut system = System::default();
        for _ in 0..50 {
            let address = i64::from(rand::random::<u16>() % 8188);
            let data: u32 = rand::random();
            system.pipeline.execute = InstructionRecord {
                opcode: Opcode::Sw,
                memory_address: Some(address),
                result: Some(data),
                ..InstructionRecord::nop()
            };
            system.pipeline_memory();
            assert_eq!(system.read_word(address), Ok(data));

            system.pipeline.execute = InstructionRecord {
                opcode: Opcode::Lw,
                memory_address: Some(address),
                ..InstructionRecord::nop()
            };
            system.pipeline_memory();
            assert_eq!(system.pipeline.memory.result, Some(data));
        }
    }

    #[test]
    fn oversize_load_reports() {
        let mut system = System::default();
        system.pipeline.execute = InstructionRecord {
            opcode: Opcode::Lw,
            memory_address: Some(8190),
            ..InstructionRecord::nop()
        };
        system.pipeline_memory();
        assert_eq!(system.pipeline.memory.result, Some(0));
        assert_eq!(
            system.take_diagnostics()[0].error,
            SimError::UnalignedOversizeAccess {
                address: 8190,
                capacity: 8192
            }
        );
    }

    #[test]
    fn other_instructions_pass_through() {
        let mut system = System::default();
        let instr = InstructionRecord {
            opcode: Opcode::Add,
            result: Some(3),
            ..InstructionRecord::nop()
        };
        system.pipeline.execute = instr.clone();
        system.pipeline_memory();
        assert_eq!(system.pipeline.memory, instr);
        assert!(system.pipeline.execute.is_nop());
    }
}
