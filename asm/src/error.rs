use arch::word::WordError;
use thiserror::Error;

/// Unified error type for the assembly engine. All of these abort the
/// compilation unit they occur in; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Word(#[from] WordError),

    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("Address of {0} has not been resolved yet")]
    UnresolvedAddress(String),

    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    #[error("Invalid instruction: neither opcode nor pointer")]
    InvalidInstruction,

    #[error("Image needs {need} words but the buffer holds {have}")]
    ImageOverflow { need: usize, have: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
