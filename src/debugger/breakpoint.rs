//! Software breakpoints: patch the trap opcode into the low byte of the
//! 8-byte word at a site, remembering the original byte so it can be
//! restored.

use crate::debugger::address::RealAddr;
use crate::debugger::error::Error;
use crate::debugger::tracer;
use nix::unistd::Pid;
use std::collections::HashMap;

const INT3: u8 = 0xcc;
const LOW_BYTE_MASK: u64 = 0xff;

#[derive(Debug, Clone)]
struct Site {
    saved_byte: u8,
    armed: bool,
}

/// Every breakpoint site currently known to the session, keyed by the
/// live process address it sits at.
#[derive(Debug, Default)]
pub struct BreakpointTable {
    sites: HashMap<RealAddr, Site>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self, addr: RealAddr) -> bool {
        self.sites.get(&addr).map(|s| s.armed).unwrap_or(false)
    }

    pub fn contains(&self, addr: RealAddr) -> bool {
        self.sites.contains_key(&addr)
    }

    pub fn addresses(&self) -> impl Iterator<Item = RealAddr> + '_ {
        self.sites.keys().copied()
    }

    /// Arms the site at `addr`, creating it first if absent. No-op if
    /// already armed. Leaves the table unchanged if either ptrace
    /// operation fails.
    pub fn enable(&mut self, pid: Pid, addr: RealAddr) -> Result<(), Error> {
        if self.is_armed(addr) {
            return Ok(());
        }
        let word = tracer::read_word(pid, addr)?;
        let saved_byte = (word & LOW_BYTE_MASK) as u8;
        let patched = (word & !LOW_BYTE_MASK) | INT3 as u64;
        tracer::write_word(pid, addr, patched)?;
        self.sites.insert(addr, Site { saved_byte, armed: true });
        Ok(())
    }

    /// Disarms the site at `addr`. No-op if absent or already disarmed.
    pub fn disable(&mut self, pid: Pid, addr: RealAddr) -> Result<(), Error> {
        let Some(site) = self.sites.get(&addr) else {
            return Ok(());
        };
        if !site.armed {
            return Ok(());
        }
        let saved_byte = site.saved_byte;
        let word = tracer::read_word(pid, addr)?;
        let restored = (word & !LOW_BYTE_MASK) | saved_byte as u64;
        tracer::write_word(pid, addr, restored)?;
        if let Some(site) = self.sites.get_mut(&addr) {
            site.armed = false;
        }
        Ok(())
    }

    /// Disarms (if needed) and forgets the site.
    pub fn delete(&mut self, pid: Pid, addr: RealAddr) -> Result<(), Error> {
        self.disable(pid, addr)?;
        self.sites.remove(&addr);
        Ok(())
    }

    /// Runs the "land on a breakpoint, execute the original instruction,
    /// re-arm" protocol. `pc` is the PC *after* the trap (i.e. one past
    /// the breakpoint address). Returns the rewound PC.
    pub fn step_over_breakpoint(&mut self, pid: Pid, pc: RealAddr) -> Result<RealAddr, Error> {
        let bp_addr = pc.offset(-1);
        if !self.is_armed(bp_addr) {
            return Ok(pc);
        }
        crate::debugger::register::RegisterSnapshot::write(
            pid,
            crate::debugger::register::Register::Rip,
            bp_addr.0 as u64,
        )?;
        self.disable(pid, bp_addr)?;
        tracer::single_step(pid)?;
        tracer::wait(pid)?;
        self.enable(pid, bp_addr)?;
        Ok(bp_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_site_is_not_armed() {
        let table = BreakpointTable::new();
        assert!(!table.is_armed(RealAddr(0x1000)));
        assert!(!table.contains(RealAddr(0x1000)));
    }
}
