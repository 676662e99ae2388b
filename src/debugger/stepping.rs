//! The stepping state machine: continue, single-step, step-in, step-over,
//! step-out, and run-to-line, built on top of the breakpoint engine and
//! the debug-info oracle. Every verb here leaves the tracee stopped
//! before returning (or reports that it has exited).

use crate::debugger::address::{DbgAddr, RealAddr};
use crate::debugger::error::Error;
use crate::debugger::register::{Register, RegisterSnapshot};
use crate::debugger::tracer;
use crate::debugger::Debugger;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// The classified result of a kernel wait after `continue`/`single-step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stopped at an armed breakpoint, already rewound to its address.
    Breakpoint(RealAddr),
    /// Stopped due to a signal other than the trap used for breakpoints.
    Signal(Signal),
    /// The tracee has exited with this status code.
    Exited(i32),
}

impl Debugger {
    /// The live `rip`, converted through the load bias.
    pub fn current_pc(&self) -> Result<DbgAddr, Error> {
        let rip = RegisterSnapshot::read(self.pid, Register::Rip)?;
        Ok(self.bias.to_dbg(RealAddr(rip as usize)))
    }

    fn current_pc_real(&self) -> Result<RealAddr, Error> {
        let rip = RegisterSnapshot::read(self.pid, Register::Rip)?;
        Ok(RealAddr(rip as usize))
    }

    /// Reads the current frame's return address from `rbp + 8`.
    fn return_addr(&self) -> Result<RealAddr, Error> {
        let rbp = RegisterSnapshot::read(self.pid, Register::Rbp)?;
        let word = tracer::read_word(self.pid, RealAddr(rbp as usize + 8))?;
        Ok(RealAddr(word as usize))
    }

    /// Blocks on the kernel until the tracee changes state and classifies
    /// the result. If the stop lands on an armed breakpoint (`rip - 1`),
    /// rewinds `rip` to the breakpoint's address — this is the only place
    /// `rip` is rewound.
    fn wait_and_classify(&mut self) -> Result<StopReason, Error> {
        match tracer::wait(self.pid)? {
            WaitStatus::Exited(_, code) => Ok(StopReason::Exited(code)),
            WaitStatus::Signaled(_, sig, _) => {
                log::warn!("tracee terminated by signal {sig}");
                Err(Error::TraceeGone)
            }
            WaitStatus::Stopped(_, Signal::SIGTRAP) => {
                let pc = self.current_pc_real()?;
                let bp_addr = pc.offset(-1);
                if self.breakpoints.is_armed(bp_addr) {
                    RegisterSnapshot::write(self.pid, Register::Rip, bp_addr.0 as u64)?;
                    Ok(StopReason::Breakpoint(bp_addr))
                } else {
                    Ok(StopReason::Signal(Signal::SIGTRAP))
                }
            }
            WaitStatus::Stopped(_, sig) => Ok(StopReason::Signal(sig)),
            other => {
                log::warn!("unexpected wait status: {other:?}");
                Ok(StopReason::Signal(Signal::SIGTRAP))
            }
        }
    }

    /// If currently stopped on an armed breakpoint, steps over it
    /// transparently (disable, single-step, re-enable) before anything
    /// else is allowed to run.
    fn step_over_current_breakpoint(&mut self) -> Result<(), Error> {
        let pc = self.current_pc_real()?;
        if self.breakpoints.is_armed(pc) {
            self.breakpoints.disable(self.pid, pc)?;
            tracer::single_step(self.pid)?;
            tracer::wait(self.pid)?;
            self.breakpoints.enable(self.pid, pc)?;
        }
        Ok(())
    }

    /// Resumes the tracee until the next breakpoint, signal, or exit.
    pub fn continue_(&mut self) -> Result<StopReason, Error> {
        self.step_over_current_breakpoint()?;
        tracer::cont(self.pid)?;
        self.wait_and_classify()
    }

    /// A single kernel single-step; no breakpoint bookkeeping beyond the
    /// transparent step-over if currently parked on an armed site.
    pub fn single_step(&mut self) -> Result<StopReason, Error> {
        let pc = self.current_pc_real()?;
        if self.breakpoints.is_armed(pc) {
            self.breakpoints.disable(self.pid, pc)?;
            tracer::single_step(self.pid)?;
            let reason = self.wait_and_classify()?;
            self.breakpoints.enable(self.pid, pc)?;
            return Ok(reason);
        }
        tracer::single_step(self.pid)?;
        self.wait_and_classify()
    }

    /// Steps one instruction at a time until the line entry for the new
    /// PC differs from the entry for the original PC and is flagged as a
    /// new statement.
    pub fn step_in(&mut self) -> Result<StopReason, Error> {
        let start = self.oracle.line_entry_from_pc(self.current_pc()?);
        loop {
            match self.single_step()? {
                StopReason::Breakpoint(addr) => return Ok(StopReason::Breakpoint(addr)),
                StopReason::Exited(code) => return Ok(StopReason::Exited(code)),
                StopReason::Signal(sig) if sig != Signal::SIGTRAP => {
                    return Ok(StopReason::Signal(sig));
                }
                StopReason::Signal(_) => {}
            }
            let here = self.oracle.line_entry_from_pc(self.current_pc()?);
            let moved = match (&start, &here) {
                (Some(a), Some(b)) => a.addr != b.addr || a.line != b.line,
                _ => true,
            };
            if moved {
                if let Some(entry) = &here {
                    if entry.is_new_statement {
                        return Ok(StopReason::Signal(Signal::SIGTRAP));
                    }
                } else {
                    return Ok(StopReason::Signal(Signal::SIGTRAP));
                }
            }
        }
    }

    /// Places a disposable breakpoint on every `is_new_statement` line
    /// entry in the current subprogram (except the current line) plus
    /// one on the return address, continues, and tears the disposable
    /// sites down at the first stop.
    pub fn step_over(&mut self) -> Result<StopReason, Error> {
        let pc = self.current_pc()?;
        let Some(sym) = self.oracle.sym_by_addr(pc).cloned() else {
            return self.single_step();
        };
        let Some(current) = self.oracle.line_entry_from_pc(pc) else {
            return self.single_step();
        };
        let Some(filepath) = self.oracle.sym_filepath(&sym) else {
            return self.single_step();
        };
        let filepath = filepath.to_string_lossy().into_owned();

        let mut disposable = Vec::new();
        let mut entries = Vec::new();
        let res = self
            .oracle
            .for_each_line_in_subprog(sym.name(), &filepath, |entry| {
                entries.push(entry.clone());
                Ok(())
            });
        if res.is_ok() {
            for entry in entries {
                if entry.addr == current.addr {
                    continue;
                }
                let real = self.bias.to_real(entry.addr);
                if !self.breakpoints.contains(real) {
                    self.breakpoints.enable(self.pid, real)?;
                    disposable.push(real);
                }
            }
        }

        if let Ok(ret) = self.return_addr() {
            if !self.breakpoints.contains(ret) {
                self.breakpoints.enable(self.pid, ret)?;
                disposable.push(ret);
            }
        }

        let reason = self.continue_()?;

        for addr in disposable {
            self.breakpoints.delete(self.pid, addr)?;
        }

        Ok(reason)
    }

    /// Places a disposable breakpoint on the current frame's return
    /// address and continues; removes the site once control returns.
    pub fn step_out(&mut self) -> Result<StopReason, Error> {
        let ret = self.return_addr()?;
        let already_set = self.breakpoints.contains(ret);
        if !already_set {
            self.breakpoints.enable(self.pid, ret)?;
        }
        let reason = self.continue_()?;
        if !already_set {
            self.breakpoints.delete(self.pid, ret)?;
        }
        Ok(reason)
    }

    /// Sets a breakpoint at `addr_at(file, line)` and continues; the
    /// breakpoint is left armed unless `one_shot` is set.
    pub fn run_to_line(&mut self, file: &str, line: u64, one_shot: bool) -> Result<StopReason, Error> {
        let addr = self.oracle.addr_at(file, line)?;
        let real = self.bias.to_real(addr);
        self.breakpoints.enable(self.pid, real)?;
        let reason = self.continue_()?;
        if one_shot {
            self.breakpoints.delete(self.pid, real)?;
        }
        Ok(reason)
    }
}
