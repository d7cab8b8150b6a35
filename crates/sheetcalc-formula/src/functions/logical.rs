//! Logical functions

use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
use sheetcalc_core::CellError;

/// Truth value of a condition
///
/// Booleans as is, numbers when non-zero, text spelling TRUE/FALSE or a
/// number. Any other text is `#VALUE!`; errors propagate.
pub fn condition_value(value: &FormulaValue) -> Result<bool, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        other => other.as_bool().ok_or(CellError::Value),
    }
}

/// IF(condition, value_if_true, value_if_false)
///
/// Only the selected branch is evaluated.
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let [condition, if_true, if_false] = args else {
        return Ok(FormulaValue::Error(CellError::Value));
    };

    match condition_value(&evaluate(condition, ctx)?) {
        Ok(true) => evaluate(if_true, ctx),
        Ok(false) => evaluate(if_false, ctx),
        Err(e) => Ok(FormulaValue::Error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate_formula;
    use sheetcalc_core::Sheet;

    fn eval(formula: &str, a1: &str) -> String {
        let cells: Sheet = [("A1", a1), ("B1", "Bob"), ("B2", "bob")].into_iter().collect();
        evaluate_formula(formula, "C1", &cells)
    }

    #[test]
    fn test_if_compares_cell_against_number() {
        assert_eq!(eval("=IF(A1>5,\"big\",\"small\")", "10"), "big");
        assert_eq!(eval("=IF(A1>5,\"big\",\"small\")", "3"), "small");
        assert_eq!(eval("=IF(A1>5,\"big\",\"small\")", "abc"), "small");
        assert_eq!(eval("=IF(A1>5,\"big\",\"small\")", ""), "small");
    }

    #[test]
    fn test_if_all_comparison_operators() {
        for (op, expected) in [
            (">", "no"),
            ("<", "no"),
            (">=", "yes"),
            ("<=", "yes"),
            ("==", "yes"),
            ("=", "yes"),
            ("!=", "no"),
            ("<>", "no"),
        ] {
            let formula = format!("=IF(A1{}5,\"yes\",\"no\")", op);
            assert_eq!(eval(&formula, "5"), expected, "{}", formula);
        }
    }

    #[test]
    fn test_if_branches_are_expressions() {
        assert_eq!(eval("=IF(A1>0,A1*2,0)", "4"), "8");
        assert_eq!(eval("=IF(SUM(A1:A1)>3,CONCAT(B1,\"!\"),\"none\")", "4"), "Bob!");
        assert_eq!(eval("=IF(B1=B2,\"same\",\"diff\")", "0"), "same");
        assert_eq!(eval("=IF(B1,\"x\",\"y\")", "0"), "#VALUE!");
    }

    #[test]
    fn test_if_only_evaluates_selected_branch() {
        assert_eq!(eval("=IF(A1=0,\"zero\",1/A1)", "0"), "zero");
        assert_eq!(eval("=IF(A1=0,\"zero\",1/A1)", "4"), "0.25");
    }

    #[test]
    fn test_if_arity() {
        assert_eq!(eval("=IF(A1>5,\"big\")", "10"), "#VALUE!");
        assert_eq!(eval("=IF(A1>5,1,2,3)", "10"), "#VALUE!");
    }

    #[test]
    fn test_condition_value() {
        assert_eq!(condition_value(&FormulaValue::Boolean(true)), Ok(true));
        assert_eq!(condition_value(&FormulaValue::Number(0.0)), Ok(false));
        assert_eq!(condition_value(&FormulaValue::Text("true".into())), Ok(true));
        assert_eq!(condition_value(&FormulaValue::Text("2".into())), Ok(true));
        assert_eq!(condition_value(&FormulaValue::Empty), Ok(false));
        assert_eq!(
            condition_value(&FormulaValue::Text("maybe".into())),
            Err(CellError::Value)
        );
        assert_eq!(
            condition_value(&FormulaValue::Error(CellError::Na)),
            Err(CellError::Na)
        );
    }
}
