//! Evaluates DWARF location expressions against a live register snapshot
//! and the current frame base, producing either a register designator or
//! a memory address.
//!
//! This deliberately does not drive gimli's general-purpose `Evaluation`
//! state machine (which can also yield implicit values, composite
//! pieces, and pointers into the `.debug_info` section itself) — the
//! only shapes a local variable's location ever takes here are "this
//! register" or "this address", so the expression's operations are
//! walked directly with a two-element stack.

use crate::debugger::address::{DbgAddr, LoadBias, RealAddr};
use crate::debugger::error::Error;
use crate::debugger::register::{Register, RegisterSnapshot};
use gimli::{Encoding, Expression, Operation, Reader};

/// A single location expression, valid over `range` (or everywhere, if
/// `range` is not meaningful).
#[derive(Debug, Clone)]
pub struct LocPiece<R: Reader> {
    pub range: LocRange,
    pub expr: Expression<R>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocRange {
    pub low: DbgAddr,
    pub high: DbgAddr,
    /// False when the expression has no associated range and is valid
    /// wherever the enclosing scope is (a bare `DW_FORM_exprloc`, not a
    /// location list).
    pub meaningful: bool,
}

impl LocRange {
    pub fn everywhere() -> Self {
        LocRange {
            low: DbgAddr(0),
            high: DbgAddr(0),
            meaningful: false,
        }
    }

    pub fn contains(&self, pc: DbgAddr) -> bool {
        !self.meaningful || (pc.in_range(self.low, self.high))
    }
}

#[derive(Debug, Clone)]
pub struct Loclist<R: Reader> {
    pub pieces: Vec<LocPiece<R>>,
}

impl<R: Reader> Loclist<R> {
    /// The single expression piece whose range contains `pc`, if any.
    pub fn for_pc(&self, pc: DbgAddr) -> Option<&Expression<R>> {
        self.pieces
            .iter()
            .find(|p| p.range.contains(pc))
            .map(|p| &p.expr)
    }
}

/// The result of evaluating a [`Loclist`] at a particular PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarLocation {
    Register(Register),
    MemAddr(RealAddr),
}

#[derive(Debug, Clone, Copy)]
enum StackVal {
    Const(u64),
    Addr(RealAddr),
    Reg(Register),
}

/// Evaluates `expr` against the current register snapshot and frame
/// base. `frame_base` is itself a fully resolved address (the caller
/// evaluates `DW_AT_frame_base` first, typically yielding the CFA-like
/// address `rbp` points to). Addresses produced by `DW_OP_addr` are
/// treated as debug-section addresses and are relocated through `bias`.
pub fn evaluate<R: Reader>(
    expr: &Expression<R>,
    encoding: Encoding,
    pid: nix::unistd::Pid,
    regs: &RegisterSnapshot,
    frame_base: RealAddr,
    bias: LoadBias,
) -> Result<VarLocation, Error> {
    let mut stack: Vec<StackVal> = Vec::new();
    let mut ops = expr.clone().operations(encoding);

    while let Some(op) = ops.next()? {
        match op {
            Operation::Register { register } => {
                let reg = Register::from_dwarf_number(register.0)
                    .ok_or_else(|| Error::UnsupportedOpcode(format!("DW_OP_reg{}", register.0)))?;
                stack.push(StackVal::Reg(reg));
            }
            Operation::RegisterOffset {
                register, offset, ..
            } => {
                let reg = Register::from_dwarf_number(register.0)
                    .ok_or_else(|| Error::UnsupportedOpcode(format!("DW_OP_breg{}", register.0)))?;
                let base = regs.value(reg) as i64;
                stack.push(StackVal::Addr(RealAddr((base + offset) as usize)));
            }
            Operation::FrameOffset { offset } => {
                stack.push(StackVal::Addr(frame_base.offset(offset)));
            }
            Operation::Address { address } => {
                stack.push(StackVal::Addr(bias.to_real(DbgAddr(address as usize))));
            }
            Operation::UnsignedConstant { value } => {
                stack.push(StackVal::Const(value));
            }
            Operation::SignedConstant { value } => {
                stack.push(StackVal::Const(value as u64));
            }
            Operation::Plus => {
                let rhs = pop_const_or_addr(&mut stack)?;
                let lhs = pop_const_or_addr(&mut stack)?;
                stack.push(add_vals(lhs, rhs));
            }
            Operation::PlusConstant { value } => {
                let lhs = pop_const_or_addr(&mut stack)?;
                stack.push(add_vals(lhs, value as i64));
            }
            Operation::Minus => {
                let rhs = pop_const_or_addr(&mut stack)?;
                let lhs = pop_const_or_addr(&mut stack)?;
                stack.push(add_vals(lhs, -rhs));
            }
            Operation::Deref { .. } => {
                let addr = match stack.pop() {
                    Some(StackVal::Addr(a)) => a,
                    _ => {
                        return Err(Error::UnsupportedOpcode(
                            "DW_OP_deref without an address on the stack".into(),
                        ))
                    }
                };
                let word = crate::debugger::tracer::read_word(pid, addr)?;
                stack.push(StackVal::Const(word));
            }
            other => {
                return Err(Error::UnsupportedOpcode(format!("{:?}", other)));
            }
        }
    }

    match stack.last() {
        Some(StackVal::Reg(r)) => Ok(VarLocation::Register(*r)),
        Some(StackVal::Addr(a)) => Ok(VarLocation::MemAddr(*a)),
        Some(StackVal::Const(c)) => Ok(VarLocation::MemAddr(RealAddr(*c as usize))),
        None => Err(Error::UnsupportedOpcode("empty expression".into())),
    }
}

fn pop_const_or_addr(stack: &mut Vec<StackVal>) -> Result<i64, Error> {
    match stack.pop() {
        Some(StackVal::Const(c)) => Ok(c as i64),
        Some(StackVal::Addr(a)) => Ok(a.0 as i64),
        _ => Err(Error::UnsupportedOpcode(
            "expected a value on the expression stack".into(),
        )),
    }
}

fn add_vals(lhs: i64, rhs: i64) -> StackVal {
    StackVal::Addr(RealAddr((lhs + rhs) as usize))
}
