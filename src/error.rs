//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Static failures (scanner, parser, resolver) are reported as [`LoxError`]
//! and collected, so one pass can surface several of them.  Runtime failures
//! are [`RuntimeError`]s and abort the current top-level execution.  The
//! driver only ever sees a [`RunError`], which also decides the exit status.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

/// Canonical static error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Malformed interpreter configuration file.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Source line of the error, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. } => Some(*line),
            LoxError::Io(_) | LoxError::Config(_) => None,
        }
    }
}

/// Dynamic failure raised while evaluating a resolved program.
///
/// Every variant carries the line of the offending token.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Operand must be a number.\n[line {line}]")]
    OperandNotNumber { line: usize },

    #[error("Operands must be numbers.\n[line {line}]")]
    OperandsNotNumbers { line: usize },

    #[error("Operands must be two numbers or two strings.\n[line {line}]")]
    InvalidPlusOperands { line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    #[error("Expected at least {expected} arguments but got {got}.\n[line {line}]")]
    TooFewArguments {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Only instances have properties.\n[line {line}]")]
    NotAnInstance { line: usize },

    #[error("Only instances have fields.\n[line {line}]")]
    FieldOnNonInstance { line: usize },

    #[error("Superclass must be a class.\n[line {line}]")]
    SuperclassNotClass { line: usize },

    #[error("Stack overflow.\n[line {line}]")]
    StackOverflow { line: usize },

    /// Failure reported by a host function.
    #[error("{message}\n[line {line}]")]
    Native { message: String, line: usize },

    /// The output sink refused a `print`.
    #[error("Output error: {source}\n[line {line}]")]
    Output {
        #[source]
        source: io::Error,
        line: usize,
    },
}

impl RuntimeError {
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::OperandNotNumber { line }
            | RuntimeError::OperandsNotNumbers { line }
            | RuntimeError::InvalidPlusOperands { line }
            | RuntimeError::NotCallable { line }
            | RuntimeError::TooFewArguments { line, .. }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::NotAnInstance { line }
            | RuntimeError::FieldOnNonInstance { line }
            | RuntimeError::SuperclassNotClass { line }
            | RuntimeError::StackOverflow { line }
            | RuntimeError::Native { line, .. }
            | RuntimeError::Output { line, .. } => *line,
        }
    }
}

/// Outcome of running one program (or one REPL entry) that did not succeed.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lexing, parsing or resolution failed; nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<LoxError>),

    /// Execution started and was aborted.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunError {
    /// Process exit status the batch driver reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
