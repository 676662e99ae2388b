//! Frame-pointer walk: reconstructs the call stack by following saved
//! `rbp` chains rather than consulting CFI/unwind tables. Any memory
//! read failure truncates the trace rather than aborting it.

use crate::debugger::address::{DbgAddr, RealAddr};
use crate::debugger::error::Error;
use crate::debugger::register::{Register, RegisterSnapshot};
use crate::debugger::tracer;
use crate::debugger::Debugger;

/// The canonical `push rbp; mov rsp, rbp` prologue, read as a little-endian
/// 4-byte sequence: `55 48 89 e5`.
const FRAME_POINTER_PROLOGUE: u32 = 0xe589_4855;

/// One entry in the reconstructed call stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub pc: DbgAddr,
    pub frame_pointer: RealAddr,
    pub function: Option<String>,
    pub line: Option<u64>,
}

impl Debugger {
    /// Whether the function containing `pc` appears to store a frame
    /// pointer, judged by comparing its first four instruction bytes to
    /// the canonical prologue. Returns `false` (not an error) when the
    /// function's start address or its first word can't be read — the
    /// caller treats that the same as "no frame pointer" and proceeds
    /// with a best-effort walk, surfacing [`Error::NoFramePointer`] as a
    /// warning rather than failing the whole backtrace.
    fn stores_frame_pointer(&self, pc: DbgAddr) -> bool {
        let Some(sym) = self.oracle.sym_by_addr(pc) else {
            return false;
        };
        let start = self.bias.to_real(sym.start_addr());
        let Ok(word) = tracer::read_word(self.pid, start) else {
            return false;
        };
        (word as u32) == FRAME_POINTER_PROLOGUE
    }

    /// Walks the call stack from the current `(rip, rbp)`, emitting a
    /// frame per iteration until the saved frame pointer is zero or a
    /// memory read fails.
    pub fn backtrace(&self) -> Result<Vec<CallFrame>, Error> {
        let pc = self.current_pc()?;
        let rbp = RegisterSnapshot::read(self.pid, Register::Rbp)?;
        let mut frame_pointer = RealAddr(rbp as usize);

        if !self.stores_frame_pointer(pc) {
            let _: Option<()> = crate::weak_error!(Err(Error::NoFramePointer(pc)));
        }

        let mut frames = Vec::new();
        frames.push(self.describe_frame(pc, frame_pointer));

        while frame_pointer.0 != 0 {
            let Some(ret_addr) = crate::muted_error!(tracer::read_word(self.pid, frame_pointer.offset(8)))
            else {
                break;
            };
            let Some(next_fp) = crate::muted_error!(tracer::read_word(self.pid, frame_pointer)) else {
                break;
            };

            let next_pc = self.bias.to_dbg(RealAddr(ret_addr as usize));
            frame_pointer = RealAddr(next_fp as usize);
            frames.push(self.describe_frame(next_pc, frame_pointer));
        }

        Ok(frames)
    }

    fn describe_frame(&self, pc: DbgAddr, frame_pointer: RealAddr) -> CallFrame {
        let sym = self.oracle.sym_by_addr(pc);
        let function = sym.map(|s| s.name().to_string());
        let line = self.oracle.addr_position(pc).map(|p| p.line);
        CallFrame {
            pc,
            frame_pointer,
            function,
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prologue_constant_matches_push_rbp_mov_rsp_rbp() {
        let bytes: [u8; 4] = [0x55, 0x48, 0x89, 0xe5];
        let word = u32::from_le_bytes(bytes);
        assert_eq!(word, FRAME_POINTER_PROLOGUE);
    }
}
