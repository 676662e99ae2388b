use crate::debugger::address::{DbgAddr, RealAddr};
use crate::debugger::register::Register;
use thiserror::Error;

/// The crate-wide error taxonomy. The tracer, the oracle, the breakpoint
/// table, the evaluator, and the session all return this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("ptrace request failed: {0}")]
    TracerError(#[from] nix::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no debug info for {0}")]
    OracleMiss(String),

    #[error("failed to parse debug information: {0}")]
    OracleParse(String),

    #[error("malformed debuggee file: {0}")]
    Invalid(String),

    #[error("unsupported debuggee file: {0}")]
    Unsupported(String),

    #[error("unsupported location opcode: {0}")]
    UnsupportedOpcode(String),

    #[error("function at {0} does not appear to store a frame pointer")]
    NoFramePointer(DbgAddr),

    #[error("tracee is gone")]
    TraceeGone,

    #[error("invalid input: {0}")]
    BadUserInput(String),

    #[error("unknown register: {0}")]
    UnknownRegister(String),

    #[error("register {0:?} has no dwarf number")]
    NoDwarfNumber(Register),

    #[error("address {0} is not mapped")]
    UnmappedAddress(RealAddr),
}

impl Error {
    /// Whether this error should terminate the whole session rather than
    /// merely being reported back to the caller of a verb.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::TraceeGone
                | Error::OracleParse(_)
                | Error::Invalid(_)
                | Error::Unsupported(_)
                | Error::TracerError(_)
        )
    }
}

impl From<gimli::read::Error> for Error {
    fn from(e: gimli::read::Error) -> Self {
        Error::OracleParse(e.to_string())
    }
}

impl From<object::Error> for Error {
    fn from(e: object::Error) -> Self {
        Error::OracleParse(e.to_string())
    }
}
