//! Text functions

use super::scalar_text;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};

/// Apply a text transform to the single scalar argument
fn map_text(args: &[FormulaValue], f: impl FnOnce(String) -> FormulaValue) -> FormulaValue {
    match args.first().map(scalar_text) {
        Some(Ok(text)) => f(text),
        Some(Err(e)) => FormulaValue::Error(e),
        None => FormulaValue::Error(sheetcalc_core::CellError::Value),
    }
}

/// CONCAT(text1, [text2], ...)
///
/// Joins with no separator; a range contributes its cells row by row.
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            FormulaValue::Array(arr) => {
                for v in arr.iter().flatten() {
                    out.push_str(&v.as_string());
                }
            }
            _ => out.push_str(&arg.as_string()),
        }
    }
    Ok(FormulaValue::Text(out))
}

/// LEN(text) - Number of characters
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| {
        FormulaValue::Number(s.chars().count() as f64)
    }))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| FormulaValue::Text(s.to_uppercase())))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| FormulaValue::Text(s.to_lowercase())))
}
