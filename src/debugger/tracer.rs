//! Thin, typed wrapper over `ptrace(2)`. Every operation is synchronous
//! with respect to the tracee and reports kernel failures rather than
//! swallowing them.
//!
//! `read_word`/`write_word` operate on whole 8-byte words, matching the
//! granularity of `PTRACE_PEEKDATA`/`PTRACE_POKEDATA`. A legitimate
//! result of all-ones (`0xFFFF...FF`) must not be confused with an
//! error; `nix::sys::ptrace::read` clears `errno` before issuing the
//! request and checks it afterwards, so a genuine all-ones word is
//! never misreported as a failed read.

use crate::debugger::address::RealAddr;
use crate::debugger::error::Error;
use crate::debugger::register::RegisterSnapshot;
use nix::sys::ptrace;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

pub fn read_word(pid: Pid, addr: RealAddr) -> Result<u64, Error> {
    let word = ptrace::read(pid, addr.0 as ptrace::AddressType)?;
    Ok(word as u64)
}

pub fn write_word(pid: Pid, addr: RealAddr, value: u64) -> Result<(), Error> {
    ptrace::write(pid, addr.0 as ptrace::AddressType, value as i64)?;
    Ok(())
}

pub fn read_registers(pid: Pid) -> Result<RegisterSnapshot, Error> {
    RegisterSnapshot::current(pid)
}

pub fn write_registers(pid: Pid, regs: &RegisterSnapshot) -> Result<(), Error> {
    regs.persist(pid)
}

pub fn cont(pid: Pid) -> Result<(), Error> {
    ptrace::cont(pid, None)?;
    Ok(())
}

pub fn single_step(pid: Pid) -> Result<(), Error> {
    ptrace::step(pid, None)?;
    Ok(())
}

pub fn trace_me() -> Result<(), Error> {
    ptrace::traceme()?;
    Ok(())
}

/// Blocks until the tracee changes state, classifying the result.
pub fn wait(pid: Pid) -> Result<WaitStatus, Error> {
    Ok(waitpid(pid, None)?)
}
