//! Formula error types

use sheetcalc_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// These never reach the caller of [`evaluate_formula`](crate::evaluate_formula);
/// they are rendered as a [`CellError`] code instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Bare identifier that is neither a reference nor a literal
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}

impl FormulaError {
    /// The error code displayed in place of a result
    pub fn to_cell_error(&self) -> CellError {
        match self {
            FormulaError::Parse(_)
            | FormulaError::UnknownFunction(_)
            | FormulaError::UnknownName(_) => CellError::Name,
            FormulaError::Argument(_) | FormulaError::ArgumentCount { .. } => CellError::Value,
            FormulaError::Evaluation(_) => CellError::Error,
        }
    }
}
