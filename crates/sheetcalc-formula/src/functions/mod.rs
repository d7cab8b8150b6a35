//! Built-in functions
//!
//! Each [`Function`] variant maps to one implementation. Most take their
//! arguments already evaluated; `IF` takes the unevaluated expressions so only
//! the chosen branch runs.

pub mod aggregate;
pub mod date;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::ast::{FormulaExpr, Function};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use sheetcalc_core::CellError;

/// Function implementation signature
///
/// Functions can consult the evaluation context (date formats, clock, cells).
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Implementation that evaluates its own arguments
pub type LazyFunctionImpl = fn(&[FormulaExpr], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How a function receives its arguments
#[derive(Clone, Copy)]
pub enum Implementation {
    /// Arguments are evaluated first, left to right
    Eager(FunctionImpl),
    /// Arguments are passed as expressions
    Lazy(LazyFunctionImpl),
}

/// Resolve the implementation of a function
pub fn implementation(func: Function) -> Implementation {
    use Implementation::{Eager, Lazy};

    match func {
        Function::Sum => Eager(aggregate::fn_sum),
        Function::Average => Eager(aggregate::fn_average),
        Function::Min => Eager(aggregate::fn_min),
        Function::Max => Eager(aggregate::fn_max),
        Function::Count => Eager(aggregate::fn_count),
        Function::CountA => Eager(aggregate::fn_counta),
        Function::Round => Eager(math::fn_round),
        Function::Concat => Eager(text::fn_concat),
        Function::Len => Eager(text::fn_len),
        Function::Upper => Eager(text::fn_upper),
        Function::Lower => Eager(text::fn_lower),
        Function::Today => Eager(date::fn_today),
        Function::Now => Eager(date::fn_now),
        Function::If => Lazy(logical::fn_if),
        Function::VLookup => Eager(lookup::fn_vlookup),
    }
}

/// Text of a scalar argument; arrays are `#VALUE!`, errors propagate
pub(crate) fn scalar_text(value: &FormulaValue) -> Result<String, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::Array(_) => Err(CellError::Value),
        other => Ok(other.as_string()),
    }
}
