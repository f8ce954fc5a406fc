use strum_macros::{Display, EnumIter};

pub type Cycle = usize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Default, Hash, Display, EnumIter)]
pub enum PipelineStage {
    Fetch,
    Decode,
    Execute,
    Memory,
    WriteBack,
    #[default]
    System, // for calls from outside the pipeline
}

/// Formats a 32-bit value as two space separated halfwords, e.g. `"AABB CCDD"`
pub fn format_word(value: u32) -> String {
    format!("{:04X} {:04X}", value >> 16, value & 0xFFFF)
}

/// Parses a hex word as produced by `format_word`. Whitespace is ignored and
/// an optional `0x` prefix is accepted
pub fn parse_word(text: &str) -> Option<u32> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
