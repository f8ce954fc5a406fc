use std::fmt::Display;

use log::{error, info};

use crate::common::format_word;
use crate::errors::SimError;

pub const GEN_REG_COUNT: usize = 32;

/// The general purpose register file. Register 0 is hardwired to zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet {
    general: [u32; GEN_REG_COUNT],
    // "last uploaded" state, kept across resets
    baseline: [u32; GEN_REG_COUNT],
}

impl Default for RegisterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterSet {
    pub fn new() -> Self {
        RegisterSet {
            general: [0; GEN_REG_COUNT],
            baseline: [0; GEN_REG_COUNT],
        }
    }

    /// Reads general register `num`, or returns an error for an index outside
    /// of the register file
    pub fn try_read(&self, num: usize) -> Result<u32, SimError> {
        match num {
            0 => Ok(0),
            n if n < GEN_REG_COUNT => Ok(self.general[n]),
            n => Err(SimError::InvalidRegisterIndex(n)),
        }
    }

    /// Reads general register `num`. Invalid indices are logged and read as 0
    pub fn read(&self, num: usize) -> u32 {
        self.try_read(num).unwrap_or_else(|e| {
            error!("{e}, reading as 0");
            0
        })
    }

    /// Writes `data` to general register `num`. Writes to register 0 are
    /// silently dropped
    pub fn try_write(&mut self, num: usize, data: u32) -> Result<(), SimError> {
        match num {
            0 => Ok(()),
            n if n < GEN_REG_COUNT => {
                info!("Wrote {} to general register {n}", format_word(data));
                self.general[n] = data;
                Ok(())
            }
            n => Err(SimError::InvalidRegisterIndex(n)),
        }
    }

    /// Writes `data` to general register `num`, logging and dropping writes
    /// to invalid indices
    pub fn write(&mut self, num: usize, data: u32) {
        if let Err(e) = self.try_write(num, data) {
            error!("{e}, treating write as NOOP");
        }
    }

    pub fn reset(&mut self) {
        self.general = [0; GEN_REG_COUNT];
    }

    /// Saves the current contents as the baseline restored by `restore_from_baseline`
    pub fn snapshot_as_baseline(&mut self) {
        self.general[0] = 0;
        self.baseline = self.general;
    }

    /// Restores the saved baseline. Register 0 is zeroed regardless of
    /// what the baseline holds
    pub fn restore_from_baseline(&mut self) {
        self.general = self.baseline;
        self.general[0] = 0;
    }

    pub fn values(&self) -> &[u32; GEN_REG_COUNT] {
        &self.general
    }
}

impl Display for RegisterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, reg) in self.general.iter().enumerate() {
            writeln!(f, "${i:02}: {}", format_word(*reg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{RegisterSet, GEN_REG_COUNT};
    use crate::errors::SimError;

    use rand::random;

    #[test]
    fn zero_register_is_hardwired() {
        let mut regs = RegisterSet::new();
        regs.write(0, 0xDEAD_BEEF);
        assert_eq!(regs.read(0), 0);
        assert!(regs.try_write(0, 5).is_ok());
        assert_eq!(regs.try_read(0), Ok(0));
    }

    #[test]
    fn writes_read_back() {
        let mut regs = RegisterSet::new();
        let vals: Vec<u32> = (0..GEN_REG_COUNT).map(|_| random()).collect();
        for (i, val) in vals.iter().enumerate() {
            regs.write(i, *val);
        }
        assert_eq!(regs.read(0), 0);
        for i in 1..GEN_REG_COUNT {
            assert_eq!(regs.read(i), vals[i]);
        }
    }

    #[test]
    fn invalid_index_reads_zero_and_drops_writes() {
        let mut regs = RegisterSet::new();
        assert_eq!(regs.read(32), 0);
        assert_eq!(regs.try_read(40), Err(SimError::InvalidRegisterIndex(40)));
        assert_eq!(
            regs.try_write(32, 1),
            Err(SimError::InvalidRegisterIndex(32))
        );
        regs.write(usize::MAX, 7);
        assert_eq!(regs, RegisterSet::new());
    }

    #[test]
    fn baseline_is_a_copy() {
        let mut regs = RegisterSet::new();
        regs.write(3, 33);
        regs.snapshot_as_baseline();
        regs.write(3, 44);
        regs.reset();
        assert_eq!(regs.read(3), 0);
        regs.restore_from_baseline();
        assert_eq!(regs.read(3), 33);
    }

    #[test]
    fn restore_zeroes_register_zero() {
        let mut regs = RegisterSet::new();
        regs.baseline[0] = 0xFFFF_FFFF;
        regs.baseline[1] = 1;
        regs.restore_from_baseline();
        assert_eq!(regs.values()[0], 0);
        assert_eq!(regs.read(1), 1);
    }

    #[test]
    fn displays_every_register() {
        let mut regs = RegisterSet::new();
        regs.write(31, 0x1234_5678);
        let shown = regs.to_string();
        assert_eq!(shown.lines().count(), GEN_REG_COUNT);
        assert!(shown.contains("$00: 0000 0000"));
        assert!(shown.contains("$31: 1234 5678"));
    }

    #[test]
    fn reset_twice_matches_once() {
        let mut once = RegisterSet::new();
        once.write(2, 2);
        once.reset();
        let mut twice = once.clone();
        twice.reset();
        assert_eq!(once, twice);
    }
}
