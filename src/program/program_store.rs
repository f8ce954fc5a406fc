use std::fmt::Display;

use log::info;

/// A single source line, addressed by its zero based line index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLine {
    pub address: usize,
    pub instruction: String,
}

impl ProgramLine {
    /// Returns the address as a 4 digit hex label, e.g. `"000A"`
    pub fn address_label(&self) -> String {
        format!("{:04X}", self.address)
    }
}

/// The ordered, comment stripped program the pipeline fetches from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<ProgramLine>,
}

// strips a trailing `#` comment, then normalizes whitespace at the ends and case
fn clean_line(line: &str) -> String {
    line.split('#').next().unwrap_or_default().trim().to_uppercase()
}

impl Program {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<ProgramLine> = lines
            .into_iter()
            .enumerate()
            .map(|(address, line)| ProgramLine {
                address,
                instruction: clean_line(line.as_ref()),
            })
            .collect();
        info!("Loaded program with {} lines", lines.len());

        Self { lines }
    }

    pub fn from_source(source: &str) -> Self {
        Self::from_lines(source.lines())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, address: usize) -> Option<&ProgramLine> {
        self.lines.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramLine> {
        self.lines.iter()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}  {}", line.address_label(), line.instruction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Program;

    #[test]
    fn strips_comments_and_normalizes() {
        let program = Program::from_lines([
            "  addi $1, $0, 5   # load five",
            "# whole line comment",
            "",
            "sw $1, 4($0)",
        ]);
        assert_eq!(program.len(), 4);
        let text: Vec<&str> = program.iter().map(|l| l.instruction.as_str()).collect();
        assert_eq!(text, vec!["ADDI $1, $0, 5", "", "", "SW $1, 4($0)"]);
    }

    #[test]
    fn addresses_are_line_indices() {
        let source = (0..12).map(|i| format!("ADDI ${}, $0, 1", i % 4)).collect::<Vec<_>>().join("\n");
        let program = Program::from_source(&source);
        for (i, line) in program.iter().enumerate() {
            assert_eq!(line.address, i);
        }
        assert_eq!(program.get(10).unwrap().address_label(), "000A");
        assert!(program.get(12).is_none());
    }

    #[test]
    fn empty_program() {
        let program = Program::from_source("");
        assert!(program.is_empty());
        assert_eq!(program.to_string(), "");
    }
}
