// This module defines the error types of the superword crate using the thiserror crate
// for idiomatic Rust error handling. IrError covers everything that can go wrong while
// reading IR text: malformed syntax (with the 1-based source line), references to
// undefined values or blocks, and type mismatches the parser can detect. SynthesisError
// is raised while lowering a chain of scalar pairs to vector code: an opcode without a
// vector form, a chain whose lanes cannot be rewired without breaking def-before-use, or
// pair lanes whose operand lists disagree. It only ever aborts the chain being
// synthesized; the driver logs it and moves on. PassError is returned to callers of the
// pass and the command line driver for configuration and input problems. Result aliases
// mirror each error type.

//! Error types for the superword crate.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

use crate::ir::Opcode;

/// Errors produced while parsing or validating IR text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("undefined value reference %{name} in @{function}")]
    UndefinedValue { function: String, name: String },

    #[error("undefined block reference %{name} in @{function}")]
    UndefinedBlock { function: String, name: String },

    #[error("line {line}: type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        line: usize,
        expected: String,
        found: String,
    },
}

/// Errors that abort the synthesis of a single chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("no vector form for opcode '{}'", opcode.name())]
    Unsupported { opcode: Opcode },

    #[error("chain cannot be scheduled: {reason}")]
    Unschedulable { reason: String },

    #[error("pair lanes disagree on operand count ({lane0} vs {lane1})")]
    LaneMismatch { lane0: usize, lane1: usize },
}

/// Errors returned by the pass entry points and the command line driver.
#[derive(Error, Debug)]
pub enum PassError {
    #[error("unsupported vector width {width}: only 2 lanes are implemented")]
    UnsupportedWidth { width: u32 },

    #[error("function not found: {name}")]
    FunctionNotFound { name: String },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for IR operations.
pub type IrResult<T> = Result<T, IrError>;

/// Result type alias for chain synthesis.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Result type alias for pass entry points.
pub type PassResult<T> = Result<T, PassError>;
