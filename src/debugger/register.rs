//! The fixed table of 27 x86-64 general-purpose registers, their DWARF
//! numbers, and their canonical names. Order matches the kernel's
//! `user_regs_struct` layout.

use crate::debugger::error::Error;
use nix::sys::ptrace;
use nix::unistd::Pid;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Register {
    R15,
    R14,
    R13,
    R12,
    Rbp,
    Rbx,
    R11,
    R10,
    R9,
    R8,
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    OrigRax,
    Rip,
    Cs,
    Eflags,
    Rsp,
    Ss,
    FsBase,
    GsBase,
    Ds,
    Es,
    Fs,
    Gs,
}

pub const REGISTER_COUNT: usize = 27;

impl Register {
    /// The DWARF register number for this register, or `None` if the
    /// register has no DWARF mapping (pseudo/segment registers used by
    /// the kernel only).
    pub fn dwarf_number(self) -> Option<u16> {
        use Register::*;
        Some(match self {
            Rax => 0,
            Rdx => 1,
            Rcx => 2,
            Rbx => 3,
            Rsi => 4,
            Rdi => 5,
            Rbp => 6,
            Rsp => 7,
            R8 => 8,
            R9 => 9,
            R10 => 10,
            R11 => 11,
            R12 => 12,
            R13 => 13,
            R14 => 14,
            R15 => 15,
            Es => 50,
            Cs => 51,
            Ss => 52,
            Ds => 53,
            Fs => 54,
            Gs => 55,
            FsBase => 58,
            GsBase => 59,
            Eflags => 49,
            OrigRax | Rip => return None,
        })
    }

    /// Inverse of [`Register::dwarf_number`]: the register with the given
    /// DWARF number, or `None` if no register in the table carries it.
    pub fn from_dwarf_number(num: u16) -> Option<Register> {
        use strum::IntoEnumIterator;
        Register::iter().find(|r| r.dwarf_number() == Some(num))
    }

    /// Parses by canonical name; distinct from the `FromStr` impl only in
    /// that it reports the crate's [`Error`] type.
    pub fn from_name(name: &str) -> Result<Register, Error> {
        name.parse()
            .map_err(|_| Error::UnknownRegister(name.to_string()))
    }
}

/// A snapshot of the tracee's general-purpose registers, addressable by
/// [`Register`].
#[derive(Debug, Clone, Copy)]
pub struct RegisterSnapshot(nix::libc::user_regs_struct);

impl RegisterSnapshot {
    pub fn current(pid: Pid) -> Result<Self, Error> {
        let regs = ptrace::getregs(pid)?;
        Ok(Self(regs))
    }

    pub fn persist(&self, pid: Pid) -> Result<(), Error> {
        ptrace::setregs(pid, self.0)?;
        Ok(())
    }

    pub fn value(&self, reg: Register) -> u64 {
        use Register::*;
        let r = &self.0;
        match reg {
            R15 => r.r15,
            R14 => r.r14,
            R13 => r.r13,
            R12 => r.r12,
            Rbp => r.rbp,
            Rbx => r.rbx,
            R11 => r.r11,
            R10 => r.r10,
            R9 => r.r9,
            R8 => r.r8,
            Rax => r.rax,
            Rcx => r.rcx,
            Rdx => r.rdx,
            Rsi => r.rsi,
            Rdi => r.rdi,
            OrigRax => r.orig_rax,
            Rip => r.rip,
            Cs => r.cs,
            Eflags => r.eflags,
            Rsp => r.rsp,
            Ss => r.ss,
            FsBase => r.fs_base,
            GsBase => r.gs_base,
            Ds => r.ds,
            Es => r.es,
            Fs => r.fs,
            Gs => r.gs,
        }
    }

    pub fn update(&mut self, reg: Register, value: u64) {
        use Register::*;
        let r = &mut self.0;
        match reg {
            R15 => r.r15 = value,
            R14 => r.r14 = value,
            R13 => r.r13 = value,
            R12 => r.r12 = value,
            Rbp => r.rbp = value,
            Rbx => r.rbx = value,
            R11 => r.r11 = value,
            R10 => r.r10 = value,
            R9 => r.r9 = value,
            R8 => r.r8 = value,
            Rax => r.rax = value,
            Rcx => r.rcx = value,
            Rdx => r.rdx = value,
            Rsi => r.rsi = value,
            Rdi => r.rdi = value,
            OrigRax => r.orig_rax = value,
            Rip => r.rip = value,
            Cs => r.cs = value,
            Eflags => r.eflags = value,
            Rsp => r.rsp = value,
            Ss => r.ss = value,
            FsBase => r.fs_base = value,
            GsBase => r.gs_base = value,
            Ds => r.ds = value,
            Es => r.es = value,
            Fs => r.fs = value,
            Gs => r.gs = value,
        }
    }

    /// A snapshot with every register set to zero, for use in unit tests
    /// that exercise pure evaluation logic without a live tracee.
    #[cfg(test)]
    pub fn zeroed() -> Self {
        // SAFETY: `user_regs_struct` is a plain-old-data struct of
        // integers; an all-zero bit pattern is valid for it.
        Self(unsafe { std::mem::zeroed() })
    }

    /// Reads and writes a single register directly against the tracee,
    /// without round-tripping the whole struct.
    pub fn read(pid: Pid, reg: Register) -> Result<u64, Error> {
        Ok(Self::current(pid)?.value(reg))
    }

    pub fn write(pid: Pid, reg: Register, value: u64) -> Result<(), Error> {
        let mut snap = Self::current(pid)?;
        snap.update(reg, value);
        snap.persist(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dwarf_round_trip() {
        use strum::IntoEnumIterator;
        for reg in Register::iter() {
            if let Some(num) = reg.dwarf_number() {
                assert_eq!(Register::from_dwarf_number(num), Some(reg));
            }
        }
    }

    #[test]
    fn known_dwarf_numbers() {
        assert_eq!(Register::Rax.dwarf_number(), Some(0));
        assert_eq!(Register::Rbp.dwarf_number(), Some(6));
        assert_eq!(Register::Rsp.dwarf_number(), Some(7));
        assert_eq!(Register::R15.dwarf_number(), Some(15));
        assert_eq!(Register::Rip.dwarf_number(), None);
        assert_eq!(Register::OrigRax.dwarf_number(), None);
    }

    #[test]
    fn name_parsing() {
        assert_eq!(Register::from_name("rbp").unwrap(), Register::Rbp);
        assert!(Register::from_name("not_a_register").is_err());
    }
}
