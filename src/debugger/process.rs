//! Forks and execs the debuggee. The child requests tracing of itself
//! before exec, disables address-space-layout randomisation, and then
//! hands control to the kernel; the parent waits for the initial stop.

use crate::debugger::error::Error;
use nix::sys::personality::{self, Persona};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult, Pid};
use std::ffi::CString;

/// Forks a child that traces itself and execs `path` with `argv` (argv[0]
/// is the program name, matching `execvp`'s convention). Returns the
/// child's pid once it has stopped on its own exec trap.
pub fn spawn(path: &str, argv: &[String]) -> Result<Pid, Error> {
    let prog = CString::new(path).map_err(|_| Error::BadUserInput(path.to_string()))?;
    let mut c_argv = vec![prog.clone()];
    for a in argv {
        c_argv.push(CString::new(a.as_str()).map_err(|_| Error::BadUserInput(a.clone()))?);
    }

    // SAFETY: the child performs only async-signal-safe work (ptrace,
    // personality, execvp) before exec; no heap allocation occurs beyond
    // what was already prepared above.
    match unsafe { fork() }? {
        ForkResult::Child => {
            if let Err(e) = nix::sys::ptrace::traceme() {
                log::error!("traceme failed in child: {e}");
                std::process::exit(127);
            }
            let persona = personality::get().unwrap_or(Persona::empty());
            let _ = personality::set(persona | Persona::ADDR_NO_RANDOMIZE);
            let _ = execvp(&prog, &c_argv);
            // execvp only returns on failure.
            std::process::exit(127);
        }
        ForkResult::Parent { child } => {
            match waitpid(child, None)? {
                WaitStatus::Stopped(_, _) => Ok(child),
                other => {
                    log::warn!("unexpected initial wait status: {other:?}");
                    Ok(child)
                }
            }
        }
    }
}
