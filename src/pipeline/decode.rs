use log::{info, warn};

use crate::common::PipelineStage;
use crate::errors::SimError;
use crate::pipeline::instruction::{
    parse_literal, parse_register, sign_extend_16, to_signed, tokenize, truncate_immediate,
    InstructionRecord, Opcode, Operand,
};
use crate::system::system::System;

/// Operand layout of an instruction, chosen by its token count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandShape {
    /// `OP rd, rs, rt`
    ThreeOperand {
        rd: Operand,
        rs: Operand,
        rt: Operand,
    },
    /// `OP rd, offset(base)`
    BaseOffset {
        rd: Operand,
        base: usize,
        offset: u32,
    },
    /// `OP rd, rs`
    TwoOperand {
        rd: Operand,
        rs: Operand,
        immediate: u32,
    },
    /// `OP operand`
    OneOperand { rd: Operand, immediate: u32 },
    Bare,
}

impl OperandShape {
    /// Registers that must hold their final value before the instruction can
    /// leave decode. Branches and stores read `rd` instead of writing it
    pub fn source_registers(&self, opcode: &Opcode) -> Vec<usize> {
        let reads_rd = !opcode.writes_register();
        match self {
            OperandShape::ThreeOperand { rd, rs, rt } => {
                let mut regs: Vec<usize> = [rs.register(), rt.register()]
                    .into_iter()
                    .flatten()
                    .collect();
                if reads_rd {
                    regs.extend(rd.register());
                }
                regs
            }
            OperandShape::BaseOffset { rd, base, .. } => {
                let mut regs = vec![*base];
                if reads_rd {
                    regs.extend(rd.register());
                }
                regs
            }
            OperandShape::TwoOperand { rs, .. } => rs.register().into_iter().collect(),
            OperandShape::OneOperand { .. } | OperandShape::Bare => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    pub opcode: Opcode,
    pub shape: OperandShape,
    /// Literals that had to be truncated
    pub warnings: Vec<SimError>,
}

// register token, or literal in `radix` with oversized hex tokens truncated
fn parse_operand(token: &str, radix: u32, warnings: &mut Vec<SimError>) -> Operand {
    if let Some(num) = parse_register(token) {
        return Operand::Register(num);
    }
    let val = match truncate_immediate(token) {
        Some(truncated) => {
            let val = parse_literal(&truncated, radix);
            warnings.push(SimError::ImmediateOverflow {
                original: token.to_string(),
                truncated,
            });
            val
        }
        None => parse_literal(token, radix),
    };
    Operand::Value(val.unwrap_or(0))
}

fn parse_base_offset(
    rd: Operand,
    operand: &str,
    warnings: &mut Vec<SimError>,
) -> Option<OperandShape> {
    let (offset_text, base_text) = operand.split_once('(')?;
    let offset = if offset_text.is_empty() {
        0
    } else {
        parse_operand(offset_text, 16, warnings).value()
    };
    // an unreadable base names no register and is rejected when read
    let base = base_text
        .replace([')', '$'], "")
        .parse()
        .unwrap_or(usize::MAX);

    Some(OperandShape::BaseOffset { rd, base, offset })
}

/// Splits an instruction's text into its opcode and operand layout. Nothing
/// is read from the register file here
pub fn parse_instruction(raw: &str) -> ParsedInstruction {
    let tokens = tokenize(raw);
    let opcode = tokens
        .first()
        .map_or(Opcode::Nop, |mnemonic| Opcode::parse(&mnemonic.to_uppercase()));
    let mut warnings = Vec::new();

    let shape = match tokens.as_slice() {
        [_, rd, rs, rt] => OperandShape::ThreeOperand {
            rd: parse_operand(rd, 10, &mut warnings),
            rs: parse_operand(rs, opcode.rs_radix(), &mut warnings),
            rt: parse_operand(rt, opcode.rt_radix(), &mut warnings),
        },
        [_, rd, operand] => {
            let rd = parse_operand(rd, 10, &mut warnings);
            match parse_base_offset(rd, operand, &mut warnings) {
                Some(shape) => shape,
                None => {
                    let rs = parse_operand(operand, opcode.rs_radix(), &mut warnings);
                    let immediate = if operand.starts_with('$') {
                        0
                    } else {
                        parse_literal(operand, 10).unwrap_or(0)
                    };
                    OperandShape::TwoOperand { rd, rs, immediate }
                }
            }
        }
        [_, operand] => {
            if operand.starts_with('$') {
                OperandShape::OneOperand {
                    rd: parse_operand(operand, 10, &mut warnings),
                    immediate: 0,
                }
            } else {
                OperandShape::OneOperand {
                    rd: Operand::Register(0),
                    immediate: parse_literal(operand, 10).unwrap_or(0),
                }
            }
        }
        _ => OperandShape::Bare,
    };

    ParsedInstruction {
        opcode,
        shape,
        warnings,
    }
}

impl System {
    fn resolve(&mut self, operand: Operand) -> Operand {
        match operand {
            Operand::Register(num) => {
                Operand::Value(self.register_value(PipelineStage::Decode, num))
            }
            val @ Operand::Value(_) => val,
        }
    }

    /// Decodes the fetch latch into the decode latch. When a source register
    /// is still waiting on an older instruction a bubble is issued instead and
    /// fetch is told to hold
    pub(crate) fn pipeline_decode(&mut self) {
        self.pipeline.stalled = false;
        if self.pipeline.fetch.is_nop() {
            self.pipeline.decode = std::mem::take(&mut self.pipeline.fetch);
            return;
        }

        let parsed = parse_instruction(&self.pipeline.fetch.raw);
        let pending: Vec<usize> = parsed
            .shape
            .source_registers(&parsed.opcode)
            .into_iter()
            .filter(|num| self.pipeline.is_pending(*num))
            .collect();
        if !pending.is_empty() {
            info!(
                "Pipeline::Decode: Stalling {}, waiting on registers {pending:?}",
                self.pipeline.fetch
            );
            self.pipeline.stalled = true;
            self.pipeline.decode = InstructionRecord::nop();
            return;
        }

        for warning in parsed.warnings {
            self.report(PipelineStage::Decode, warning);
        }

        let mut instr = std::mem::take(&mut self.pipeline.fetch);
        let reads_rd = !parsed.opcode.writes_register();
        instr.opcode = parsed.opcode;
        match parsed.shape {
            OperandShape::ThreeOperand { rd, rs, rt } => {
                if reads_rd {
                    instr.branch_comparand = Some(self.resolve(rd).value());
                }
                instr.rd = rd;
                instr.rs = self.resolve(rs);
                instr.rt = self.resolve(rt);
            }
            OperandShape::BaseOffset { rd, base, offset } => {
                let base_val = self.register_value(PipelineStage::Decode, base);
                let address =
                    i64::from(base_val) + i64::from(to_signed(sign_extend_16(offset)));
                instr.memory_address = Some(address);
                if reads_rd {
                    instr.memory_value = Some(self.resolve(rd).value());
                }
                instr.rd = rd;
                instr.rs = Operand::Value(base_val);
                instr.rt = Operand::Value(offset);
            }
            OperandShape::TwoOperand { rd, rs, immediate } => {
                instr.rd = rd;
                instr.rs = self.resolve(rs);
                instr.immediate = immediate;
            }
            OperandShape::OneOperand { rd, immediate } => {
                instr.rd = rd;
                instr.immediate = immediate;
            }
            OperandShape::Bare => {
                if let Opcode::Unknown(name) = &instr.opcode {
                    warn!("Pipeline::Decode: Unrecognized instruction {name} has no operands");
                }
            }
        }
        info!("Pipeline::Decode: Decoded {instr}");

        self.pipeline.decode = instr;
    }
}
