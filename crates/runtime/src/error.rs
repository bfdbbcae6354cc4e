//! Runtime error taxonomy (§7): a single `VmError` distinguishing the fatal `FatalKind` family
//! from the compiler-crate errors that can surface before the VM ever runs a `Call`.
//!
//! Kept as a small hand-rolled `Display`/`Error` enum rather than pulled in through an
//! error-derive crate, in the style of the wider pack's `CodeGenError`.

use std::fmt;
use twx_compiler::{CompileError, LoadError, PreprocessError};
use twx_core::StoreError;

/// A script-terminating error (§7). Every variant corresponds to one of the fatal conditions
/// enumerated in the component design; the VM transitions to `Halted` and reports exactly one
/// of these per run.
#[derive(Debug, Clone, PartialEq)]
pub enum FatalKind {
    UnknownLabel { label: String },
    ReturnWithEmptyStack,
    CallStackOverflow { depth: usize },
    ArrayOutOfRange { name: String, index: i64, size: usize },
    CutTextStartBeyondEnd,
    DivideByZero,
    ModuloByZero,
    NegativeSquareRoot { value: f64 },
    IllegalPower { base: f64, exponent: f64 },
    UnknownCommand { command: String },
    Arity { command: String, expected: &'static str, got: usize },
    TypeMismatch { command: String, detail: String },
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalKind::UnknownLabel { label } => write!(f, "unknown label target: {label}"),
            FatalKind::ReturnWithEmptyStack => write!(f, "return with empty call stack"),
            FatalKind::CallStackOverflow { depth } => {
                write!(f, "call stack overflow (depth {depth})")
            }
            FatalKind::ArrayOutOfRange { name, index, size } => write!(
                f,
                "index {index} out of range for array {name}, must be 1-{size}"
            ),
            FatalKind::CutTextStartBeyondEnd => {
                write!(f, "CutText: Start position beyond End Of Line")
            }
            FatalKind::DivideByZero => write!(f, "division by zero"),
            FatalKind::ModuloByZero => write!(f, "modulo by zero"),
            FatalKind::NegativeSquareRoot { value } => {
                write!(f, "sqr of negative value {value}")
            }
            FatalKind::IllegalPower { base, exponent } => {
                write!(f, "illegal power: {base}^{exponent}")
            }
            FatalKind::UnknownCommand { command } => write!(f, "unknown command: {command}"),
            FatalKind::Arity { command, expected, got } => {
                write!(f, "{command}: expected {expected} argument(s), got {got}")
            }
            FatalKind::TypeMismatch { command, detail } => {
                write!(f, "{command}: {detail}")
            }
        }
    }
}

impl std::error::Error for FatalKind {}

impl From<StoreError> for FatalKind {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfRange { name, index, size } => {
                FatalKind::ArrayOutOfRange { name, index, size }
            }
        }
    }
}

/// Any error the VM can surface, from compile time through execution.
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    Compile(CompileError),
    Fatal(FatalKind),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Compile(e) => write!(f, "{e}"),
            VmError::Fatal(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<CompileError> for VmError {
    fn from(e: CompileError) -> Self {
        VmError::Compile(e)
    }
}

impl From<PreprocessError> for VmError {
    fn from(e: PreprocessError) -> Self {
        VmError::Compile(CompileError::Preprocess(e))
    }
}

impl From<LoadError> for VmError {
    fn from(e: LoadError) -> Self {
        VmError::Compile(CompileError::Load(e))
    }
}

impl From<FatalKind> for VmError {
    fn from(e: FatalKind) -> Self {
        VmError::Fatal(e)
    }
}

impl From<StoreError> for VmError {
    fn from(e: StoreError) -> Self {
        VmError::Fatal(e.into())
    }
}
