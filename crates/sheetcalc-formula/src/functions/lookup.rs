//! Lookup functions

use super::logical::condition_value;
use super::scalar_text;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use sheetcalc_core::{parse_number, parse_number_prefix, CellError};
use std::cmp::Ordering;

/// Ordering used by approximate match: numeric when both keys are numbers,
/// otherwise case-insensitive text
fn compare_keys(key: &str, lookup: &str) -> Ordering {
    match (parse_number(key), parse_number(lookup)) {
        (Some(k), Some(l)) => k.partial_cmp(&l).unwrap_or(Ordering::Equal),
        _ => key.to_lowercase().cmp(&lookup.to_lowercase()),
    }
}

/// Text of a row's first cell
fn key_text(row: &[FormulaValue]) -> String {
    row.first().map(FormulaValue::as_string).unwrap_or_default()
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
///
/// Scans the first column of the table row by row. Exact match (the default)
/// compares cell text to the lookup text, case-sensitively. With a true
/// `range_lookup` the last row whose key does not exceed the lookup value wins,
/// stopping at the first larger key.
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (lookup_value, table, col_index) = match args {
        [lookup, table, col] | [lookup, table, col, _] => (lookup, table, col),
        _ => return Ok(FormulaValue::Error(CellError::Value)),
    };

    let lookup_text = match scalar_text(lookup_value) {
        Ok(text) => text,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    let table = match table {
        FormulaValue::Array(rows) => rows,
        FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
        _ => return Ok(FormulaValue::Error(CellError::Na)),
    };
    let cols = table.first().map_or(0, Vec::len);
    if table.is_empty() || cols == 0 {
        return Ok(FormulaValue::Error(CellError::Na));
    }

    let col_index = match col_index {
        FormulaValue::Number(n) => n.trunc(),
        FormulaValue::Text(s) => match parse_number_prefix(s) {
            Some(n) => n.trunc(),
            None => return Ok(FormulaValue::Error(CellError::Value)),
        },
        FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
        _ => return Ok(FormulaValue::Error(CellError::Value)),
    };
    if col_index < 1.0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    if col_index > cols as f64 {
        return Ok(FormulaValue::Error(CellError::Ref));
    }
    let target = col_index as usize - 1;

    let approximate = match args.get(3) {
        Some(flag) => match condition_value(flag) {
            Ok(approximate) => approximate,
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
        None => false,
    };

    let found = if approximate {
        let mut candidate = None;
        for row in table {
            let key = key_text(row.as_slice());
            if key.is_empty() {
                continue;
            }
            if compare_keys(&key, &lookup_text) == Ordering::Greater {
                break;
            }
            candidate = Some(row);
        }
        candidate
    } else {
        table
            .iter()
            .find(|row| key_text(row.as_slice()) == lookup_text)
    };

    Ok(found
        .and_then(|row| row.get(target).cloned())
        .unwrap_or(FormulaValue::Error(CellError::Na)))
}
