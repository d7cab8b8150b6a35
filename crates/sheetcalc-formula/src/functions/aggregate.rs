//! Aggregates over a single range: SUM, AVERAGE, MIN, MAX, COUNT, COUNTA
//!
//! Each takes exactly one argument, which must be a range. Cell text is read
//! leniently, so blank and non-numeric cells count as `0`.

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use sheetcalc_core::{parse_number_prefix, CellError};

/// Flatten the single range argument, row-major
fn range_cells(args: &[FormulaValue]) -> Result<Vec<&FormulaValue>, CellError> {
    match args {
        [FormulaValue::Array(rows)] => Ok(rows.iter().flatten().collect()),
        [FormulaValue::Error(e)] => Err(*e),
        _ => Err(CellError::Value),
    }
}

fn numbers(args: &[FormulaValue]) -> Result<Vec<f64>, CellError> {
    Ok(range_cells(args)?
        .into_iter()
        .map(|cell| cell.as_number().unwrap_or(0.0))
        .collect())
}

fn aggregate(
    args: &[FormulaValue],
    reduce: impl FnOnce(&[f64]) -> f64,
) -> FormulaResult<FormulaValue> {
    match numbers(args) {
        // An empty range aggregates to 0
        Ok(values) if values.is_empty() => Ok(FormulaValue::Number(0.0)),
        Ok(values) => Ok(FormulaValue::Number(reduce(&values))),
        Err(e) => Ok(FormulaValue::Error(e)),
    }
}

/// SUM(range)
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |values| values.iter().sum())
}

/// AVERAGE(range) - blank cells count as 0 in both sum and count
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |values| {
        values.iter().sum::<f64>() / values.len() as f64
    })
}

/// MIN(range)
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |values| values.iter().copied().fold(f64::INFINITY, f64::min))
}

/// MAX(range)
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |values| {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// COUNT(range) - cells whose text starts with a number
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let cells = match range_cells(args) {
        Ok(cells) => cells,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    let count = cells
        .into_iter()
        .filter(|cell| match cell {
            FormulaValue::Number(_) => true,
            FormulaValue::Text(s) => parse_number_prefix(s).is_some(),
            _ => false,
        })
        .count();

    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA(range) - cells with non-empty text
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let cells = match range_cells(args) {
        Ok(cells) => cells,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    let count = cells
        .into_iter()
        .filter(|cell| !cell.as_string().is_empty())
        .count();

    Ok(FormulaValue::Number(count as f64))
}

#[cfg(test)]
mod tests {
    use crate::evaluate_formula;
    use sheetcalc_core::Sheet;

    fn store() -> Sheet {
        [
            ("A1", "1"),
            ("A2", "2"),
            ("A3", "x"),
            ("B1", "10"),
            ("B2", ""),
            ("B3", "-4.5"),
            ("C1", "7 apples"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_sum_coerces_non_numeric_to_zero() {
        let cells = store();
        assert_eq!(evaluate_formula("=SUM(A1:A3)", "D1", &cells), "3");
        assert_eq!(evaluate_formula("=SUM(A3:A1)", "D1", &cells), "3");
        assert_eq!(evaluate_formula("=SUM(A1:B3)", "D1", &cells), "8.5");
        assert_eq!(evaluate_formula("=SUM(C1:C1)", "D1", &cells), "7");
    }

    #[test]
    fn test_average_counts_blank_cells() {
        let cells = store();
        assert_eq!(evaluate_formula("=AVERAGE(A1:A3)", "D1", &cells), "1");
        assert_eq!(evaluate_formula("=AVERAGE(B1:B2)", "D1", &cells), "5");
        // A single empty cell is still one cell of value 0
        assert_eq!(evaluate_formula("=AVERAGE(Z1:Z1)", "D1", &cells), "0");
    }

    #[test]
    fn test_min_max() {
        let cells = store();
        assert_eq!(evaluate_formula("=MIN(B1:B3)", "D1", &cells), "-4.5");
        assert_eq!(evaluate_formula("=MAX(A1:B3)", "D1", &cells), "10");
        assert_eq!(evaluate_formula("=MIN(A1:A3)", "D1", &cells), "0");
        assert_eq!(evaluate_formula("=MAX(Z1:Z5)", "D1", &cells), "0");
    }

    #[test]
    fn test_count_and_counta() {
        let cells = store();
        assert_eq!(evaluate_formula("=COUNT(A1:C3)", "D1", &cells), "5");
        assert_eq!(evaluate_formula("=COUNTA(A1:C3)", "D1", &cells), "6");
        assert_eq!(evaluate_formula("=COUNT(Z1:Z9)", "D1", &cells), "0");
    }

    #[test]
    fn test_aggregates_require_one_range() {
        let cells = store();
        assert_eq!(evaluate_formula("=SUM(1)", "D1", &cells), "#VALUE!");
        assert_eq!(evaluate_formula("=SUM(A1)", "D1", &cells), "#VALUE!");
        assert_eq!(evaluate_formula("=SUM(A1:A2,B1:B2)", "D1", &cells), "#VALUE!");
        assert_eq!(evaluate_formula("=COUNT()", "D1", &cells), "#VALUE!");
        assert_eq!(evaluate_formula("=MAX(#N/A)", "D1", &cells), "#N/A");
    }

    #[test]
    fn test_aggregates_compose() {
        let cells = store();
        assert_eq!(evaluate_formula("=SUM(A1:A2)*2", "D1", &cells), "6");
        assert_eq!(
            evaluate_formula("=MAX(A1:A3)-MIN(B1:B3)", "D1", &cells),
            "6.5"
        );
    }
}
