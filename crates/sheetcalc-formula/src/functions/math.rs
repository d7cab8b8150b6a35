//! Math functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sheetcalc_core::{format_number, parse_number_prefix, CellError};

/// Largest accepted number of decimal places
const MAX_DECIMALS: i64 = 100;

/// Scale limit of `rust_decimal`
const MAX_DECIMAL_SCALE: i64 = 28;

/// Strict numeric argument: text must start with a number, blanks are rejected
fn number_arg(value: &FormulaValue) -> Result<f64, CellError> {
    match value {
        FormulaValue::Number(n) => Ok(*n),
        FormulaValue::Text(s) => parse_number_prefix(s).ok_or(CellError::Value),
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::Boolean(_) | FormulaValue::Empty | FormulaValue::Array(_) => {
            Err(CellError::Value)
        }
    }
}

/// ROUND(number, num_digits)
///
/// Rounds half away from zero and renders exactly `num_digits` decimals, so
/// `ROUND(2,2)` is `2.00`. Negative `num_digits` rounds left of the decimal
/// point.
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (number, digits) = match args {
        [number, digits] => (number_arg(number), number_arg(digits)),
        _ => return Ok(FormulaValue::Error(CellError::Value)),
    };

    let number = match number {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let digits = match digits {
        // Fractional digit counts truncate toward zero; anything past 308
        // places left of the point rounds to zero
        Ok(d) if d.is_finite() => d.trunc().clamp(-400.0, (MAX_DECIMALS + 1) as f64) as i64,
        Ok(_) => return Ok(FormulaValue::Error(CellError::Value)),
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    if digits > MAX_DECIMALS {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    Ok(FormulaValue::Text(round_to_text(number, digits)))
}

fn round_to_text(number: f64, digits: i64) -> String {
    if !number.is_finite() {
        return format_number(number);
    }

    if digits < 0 {
        let factor = 10_f64.powi(digits.unsigned_abs().min(308) as i32);
        let rounded = (number / factor).round() * factor;
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        return format!("{:.0}", rounded);
    }

    if digits <= MAX_DECIMAL_SCALE {
        if let Some(exact) = round_decimal(number, digits as u32) {
            return exact;
        }
    }

    // Beyond decimal precision, f64 rounding is as good as it gets
    let factor = 10_f64.powi(digits as i32);
    let scaled = number * factor;
    let rounded = if scaled.is_finite() {
        scaled.round() / factor
    } else {
        number
    };
    format!("{:.*}", digits as usize, rounded)
}

fn round_decimal(number: f64, scale: u32) -> Option<String> {
    let value = Decimal::from_f64(number)?;
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    if rounded.scale() != scale {
        return None;
    }
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    Some(rounded.to_string())
}
