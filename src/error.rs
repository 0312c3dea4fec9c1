//! Crate-wide error taxonomy.
//!
//! Every decoding entry point in this crate returns either a value (plus
//! the number of bytes consumed) or an [`Error`] naming both the kind of
//! failure and the byte offset within the section/buffer being parsed at
//! which it was detected. The library never panics on malformed input;
//! callers that want to recover from a truncated or malformed section see
//! exactly where things went wrong.

use std::fmt;

/// The taxonomy of decoding failures, per the design's error surface.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("cursor advanced past the end of the section")]
    Truncated,
    #[error("missing ELF magic")]
    NotElf,
    #[error("object endianness does not match host")]
    EndianMismatch,
    #[error("unsupported ELF class byte")]
    UnsupportedElfClass,
    #[error("DIE references an abbreviation id absent from the index")]
    InvalidAbbreviation,
    #[error("abbreviation id already present in the index")]
    DuplicateAbbreviation,
    #[error("attribute form is not recognised")]
    UnknownForm,
    #[error("value does not fit the requested width")]
    Overflow,
    #[error("inline string is not NUL-terminated within the section")]
    MalformedString,
    #[error("feature is intentionally unimplemented")]
    NotImplemented,
    #[error("attribute value does not match the requested type")]
    TypeMismatch,
    #[error("expression stack underflowed")]
    StackUnderflow,
    #[error("division or modulo by zero in an expression")]
    DivideByZero,
    #[error("branch target lies outside the expression bytecode")]
    OutOfBoundsBranch,
    #[error("expression opcode is not recognised")]
    UnknownOpcode,
    #[error("expression evaluation left no result on the stack")]
    NoResult,
    #[error("a section required for this operation is absent or was not borrowed")]
    MissingSection,
}

/// A decoding failure together with the byte offset at which it occurred.
///
/// The offset is relative to the start of whichever buffer the failing
/// operation was given (a section, an attribute value, expression
/// bytecode, ...) -- callers that need a file-absolute offset add their
/// own base.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl Error {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Error { kind, offset }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at offset {:#x}", self.kind, self.offset)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {:#x})", self.kind, self.offset)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
