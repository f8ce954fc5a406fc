use log::{info, warn};

use crate::common::PipelineStage;
use crate::errors::SimError;
use crate::pipeline::instruction::{
    sign_extend_16, to_signed, wrap_to_word, InstructionRecord, Opcode,
};
use crate::system::system::System;

/// Signed division rounding toward negative infinity
fn floor_div(lhs: i64, rhs: i64) -> i64 {
    let quot = lhs / rhs;
    if (lhs % rhs != 0) && ((lhs < 0) != (rhs < 0)) {
        quot - 1
    } else {
        quot
    }
}

impl System {
    /// Moves the decode latch through the ALU into the execute latch.
    /// A taken branch redirects the program counter and squashes the
    /// instruction fetched behind it
    pub(crate) fn pipeline_execute(&mut self) {
        let mut instr = std::mem::take(&mut self.pipeline.decode);
        let rs = instr.rs.value();
        let rt = instr.rt.value();

        match &instr.opcode {
            Opcode::Add => instr.result = Some(rs.wrapping_add(rt)),
            Opcode::Sub => instr.result = Some(rs.wrapping_sub(rt)),
            Opcode::Addi => instr.result = Some(rs.wrapping_add(sign_extend_16(rt))),
            Opcode::Subi => instr.result = Some(rs.wrapping_sub(sign_extend_16(rt))),
            // low word only, identical for signed and unsigned operands
            Opcode::Mul | Opcode::Mulu => instr.result = Some(rs.wrapping_mul(rt)),
            Opcode::Div => {
                if rt == 0 {
                    self.divide_by_zero(&mut instr);
                } else {
                    let (lhs, rhs) = (i64::from(to_signed(rs)), i64::from(to_signed(rt)));
                    instr.result = Some(wrap_to_word(floor_div(lhs, rhs)));
                    self.hi = wrap_to_word(lhs % rhs);
                }
            }
            Opcode::Divu => {
                if rt == 0 {
                    self.divide_by_zero(&mut instr);
                } else {
                    instr.result = Some(rs / rt);
                    self.hi = rs % rt;
                }
            }
            Opcode::Mfhi => instr.result = Some(self.hi),
            Opcode::And | Opcode::Andi => instr.result = Some(rs & rt),
            Opcode::Or | Opcode::Ori => instr.result = Some(rs | rt),
            Opcode::Xor | Opcode::Xori => instr.result = Some(rs ^ rt),
            Opcode::Nor => instr.result = Some(!(rs | rt)),
            Opcode::Sll => instr.result = Some(rs.wrapping_shl(rt)),
            Opcode::Srl => instr.result = Some(rs.wrapping_shr(rt)),
            Opcode::Li => instr.result = Some(sign_extend_16(rs)),
            Opcode::Lui => instr.result = Some((rs & 0xFFFF) << 16),
            Opcode::Sw => instr.result = instr.memory_value,
            Opcode::Beq | Opcode::Bne => {
                let comparand = instr.branch_comparand.unwrap_or(0);
                let taken = (instr.opcode == Opcode::Beq) == (rs == comparand);
                if taken {
                    self.take_branch(&instr, rt);
                } else {
                    info!("Pipeline::Execute: Branch {instr} not taken");
                }
            }
            // address was computed in decode
            Opcode::Lw | Opcode::Nop => {}
            Opcode::Unknown(name) => {
                warn!("Pipeline::Execute: Unrecognized opcode {name}, treating as NOOP");
            }
        }

        self.pipeline.execute = instr;
    }

    fn divide_by_zero(&mut self, instr: &mut InstructionRecord) {
        self.report(PipelineStage::Execute, SimError::DivisionByZero);
        instr.result = Some(0);
        self.hi = 0;
    }

    fn take_branch(&mut self, instr: &InstructionRecord, offset: u32) {
        let origin = instr.address.map_or(0, |addr| i64::try_from(addr).unwrap_or(i64::MAX));
        let target = origin.saturating_add(i64::from(to_signed(sign_extend_16(offset))));
        self.program_counter = usize::try_from(target).unwrap_or_else(|_| {
            warn!("Pipeline::Execute: Branch target {target} is before the program start, using 0");
            0
        });
        info!(
            "Pipeline::Execute: Branch {instr} taken, PC now {}, squashing {}",
            self.program_counter, self.pipeline.fetch
        );
        self.pipeline.fetch = InstructionRecord::nop();
    }
}
