use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{EnumString, IntoStaticStr};

static REGISTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$(\d+)$").unwrap());

/// Text placed in a latch that holds no instruction
pub const NOP_TEXT: &str = "NOP";

/// Longest literal accepted before it is cut down to 16 bits worth of hex digits
pub const MAX_IMMEDIATE_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Opcode {
    Add,
    Addi,
    Sub,
    Subi,
    Mul,
    Mulu,
    Div,
    Divu,
    And,
    Andi,
    Or,
    Ori,
    Xor,
    Xori,
    Nor,
    Sll,
    Srl,
    Mfhi,
    Beq,
    Bne,
    Lw,
    Sw,
    Li,
    Lui,
    Nop,
    #[strum(default)]
    Unknown(String),
}

impl Opcode {
    /// Parses a mnemonic, anything unrecognized becomes `Opcode::Unknown`
    pub fn parse(mnemonic: &str) -> Self {
        // infallible thanks to the default variant
        mnemonic
            .parse()
            .unwrap_or_else(|_| Opcode::Unknown(mnemonic.to_string()))
    }

    /// Whether the instruction's result is written to `rd` during write back
    pub fn writes_register(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Addi
                | Opcode::Sub
                | Opcode::Subi
                | Opcode::Mul
                | Opcode::Mulu
                | Opcode::Div
                | Opcode::Divu
                | Opcode::And
                | Opcode::Andi
                | Opcode::Or
                | Opcode::Ori
                | Opcode::Xor
                | Opcode::Xori
                | Opcode::Nor
                | Opcode::Sll
                | Opcode::Srl
                | Opcode::Mfhi
                | Opcode::Lw
                | Opcode::Li
                | Opcode::Lui
        )
    }

    /// Radix used for a literal in the `rs` slot
    pub fn rs_radix(&self) -> u32 {
        match self {
            Opcode::Li | Opcode::Lui => 16,
            _ => 10,
        }
    }

    /// Radix used for a literal in the `rt` slot
    pub fn rt_radix(&self) -> u32 {
        match self {
            Opcode::Addi
            | Opcode::Subi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Beq
            | Opcode::Bne => 16,
            _ => 10,
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Unknown(name) => write!(f, "{name}"),
            other => write!(f, "{}", <&'static str>::from(other)),
        }
    }
}

/// An operand is either still a register reference or a value already read
/// out of the register file (or decoded from a literal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(usize),
    Value(u32),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Value(0)
    }
}

impl Operand {
    /// The resolved value. Unresolved register operands read as 0
    pub fn value(self) -> u32 {
        match self {
            Operand::Value(val) => val,
            Operand::Register(_) => 0,
        }
    }

    pub fn register(self) -> Option<usize> {
        match self {
            Operand::Register(num) => Some(num),
            Operand::Value(_) => None,
        }
    }
}

/// Returns the register number for a `$N` token
pub fn parse_register(token: &str) -> Option<usize> {
    REGISTER_REGEX
        .captures(token)
        .map(|caps| caps[1].parse().unwrap_or(usize::MAX))
}

/// Parses the longest valid numeric prefix of `text` in `radix`, with an
/// optional sign (and `0x` prefix for hex). Values wrap to 32 bits. Returns
/// `None` when no digits are present
pub fn parse_literal(text: &str, radix: u32) -> Option<u32> {
    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let rest = if radix == 16 {
        rest.strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .unwrap_or(rest)
    } else {
        rest
    };

    let mut val = 0u32;
    let mut n_digits = 0;
    for digit in rest.chars().map_while(|c| c.to_digit(radix)) {
        val = val.wrapping_mul(radix).wrapping_add(digit);
        n_digits += 1;
    }

    if n_digits == 0 {
        None
    } else if negative {
        Some(val.wrapping_neg())
    } else {
        Some(val)
    }
}

/// A literal token longer than `MAX_IMMEDIATE_DIGITS` that reads as hex is cut
/// down to its first `MAX_IMMEDIATE_DIGITS` characters. Returns the truncated
/// text, if truncation happened
pub fn truncate_immediate(token: &str) -> Option<String> {
    if parse_literal(token, 16).is_some() && token.chars().count() > MAX_IMMEDIATE_DIGITS {
        Some(token.chars().take(MAX_IMMEDIATE_DIGITS).collect())
    } else {
        None
    }
}

/// Widens a 16-bit two's complement value to 32 bits
pub fn sign_extend_16(val: u32) -> u32 {
    if val & 0x8000 == 0 {
        val
    } else {
        val | 0xFFFF_0000
    }
}

/// Reinterprets the bits of a word as two's complement
pub fn to_signed(val: u32) -> i32 {
    i32::from_be_bytes(val.to_be_bytes())
}

/// Keeps the low 32 bits of a wide result
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn wrap_to_word(val: i64) -> u32 {
    (val & 0xFFFF_FFFF) as u32
}

/// Splits an instruction into its mnemonic and operand tokens
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .collect()
}

/// An instruction as it moves between pipeline latches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRecord {
    /// Source line, `None` for bubbles inserted by the pipeline itself
    pub address: Option<usize>,
    pub raw: String,
    pub opcode: Opcode,
    pub rs: Operand,
    pub rt: Operand,
    pub rd: Operand,
    pub immediate: u32,
    pub result: Option<u32>,
    pub memory_address: Option<i64>,
    pub memory_value: Option<u32>,
    pub branch_comparand: Option<u32>,
}

impl Default for InstructionRecord {
    fn default() -> Self {
        Self::nop()
    }
}

impl InstructionRecord {
    /// The empty latch sentinel
    pub fn nop() -> Self {
        Self {
            address: None,
            raw: NOP_TEXT.to_string(),
            opcode: Opcode::Nop,
            rs: Operand::default(),
            rt: Operand::default(),
            rd: Operand::Register(0),
            immediate: 0,
            result: None,
            memory_address: None,
            memory_value: None,
            branch_comparand: None,
        }
    }

    /// Creates a fresh record for the source line at `address`. Blank lines
    /// become the no-operation sentinel
    pub fn fetched(address: usize, text: &str) -> Self {
        let raw = if text.trim().is_empty() {
            NOP_TEXT.to_string()
        } else {
            text.to_string()
        };
        let opcode = tokenize(&raw)
            .first()
            .map_or(Opcode::Nop, |mnemonic| Opcode::parse(&mnemonic.to_uppercase()));

        Self {
            address: Some(address),
            raw,
            opcode,
            ..Self::nop()
        }
    }

    pub fn is_nop(&self) -> bool {
        self.opcode == Opcode::Nop
    }

    /// Whether this instruction will write general register `num` in write back
    pub fn writes_register(&self, num: usize) -> bool {
        num != 0 && self.opcode.writes_register() && self.rd == Operand::Register(num)
    }
}

impl Display for InstructionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
