//! Date functions
//!
//! `TODAY()` and `NOW()` render the current time as text using the formats
//! and clock in [`EvaluationSettings`](crate::EvaluationSettings).

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use chrono::NaiveDateTime;
use std::fmt::Write;

fn format_now(at: NaiveDateTime, pattern: &str) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    // chrono reports unknown specifiers as a fmt::Error
    write!(out, "{}", at.format(pattern)).map_err(|_| {
        FormulaError::Evaluation(format!("Invalid date format '{}'", pattern))
    })?;
    Ok(FormulaValue::Text(out))
}

/// TODAY() - Current date
pub fn fn_today(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    format_now(ctx.settings.clock.now(), &ctx.settings.date_format)
}

/// NOW() - Current date and time
pub fn fn_now(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    format_now(ctx.settings.clock.now(), &ctx.settings.datetime_format)
}
