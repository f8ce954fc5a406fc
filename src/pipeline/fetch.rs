use log::info;

use crate::pipeline::instruction::InstructionRecord;
use crate::system::system::System;

impl System {
    /// Fills the fetch latch from the program counter. Past the end of the
    /// program bubbles are supplied so the pipeline can drain
    pub(crate) fn pipeline_fetch(&mut self) {
        if self.pipeline.stalled {
            info!("Pipeline::Fetch: Decode stalled, holding {}", self.pipeline.fetch);
            return;
        }

        self.pipeline.fetch = match self.program.get(self.program_counter) {
            Some(line) => {
                info!(
                    "Pipeline::Fetch: Fetched {} from line {}",
                    line.instruction,
                    line.address_label()
                );
                self.current_line = Some(line.address);
                self.program_counter += 1;
                InstructionRecord::fetched(line.address, &line.instruction)
            }
            None => InstructionRecord::nop(),
        };
    }
}

#[cfg(test)]
mod test {
    use crate::system::system::System;

    #[test]
    fn fetches_in_order_then_bubbles() {
        let mut system = System::default();
        system.load_program(["LI $1, 1", "LI $2, 2"]);
        system.pipeline_fetch();
        assert_eq!(system.pipeline.fetch.address, Some(0));
        system.pipeline_fetch();
        assert_eq!(system.pipeline.fetch.address, Some(1));
        assert_eq!(system.current_line(), Some(1));
        system.pipeline_fetch();
        assert!(system.pipeline.fetch.is_nop());
        assert_eq!(system.program_counter(), 2);
        assert_eq!(system.current_line(), Some(1));
    }

    #[test]
    fn stall_holds_latch() {
        let mut system = System::default();
        system.load_program(["LI $1, 1", "LI $2, 2"]);
        system.pipeline_fetch();
        system.pipeline.stalled = true;
        system.pipeline_fetch();
        assert_eq!(system.pipeline.fetch.address, Some(0));
        assert_eq!(system.program_counter(), 1);
    }
}
