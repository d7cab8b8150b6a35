//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values, and renders them as the display
//! strings written back into cells.

use crate::ast::{BinaryOperator, FormulaExpr, Function, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{self, Implementation};
use crate::parser::parse_formula;
use crate::settings::EvaluationSettings;
use lazy_regex::regex_replace_all;
use sheetcalc_core::{
    format_number, lenient_number, parse_number, parse_reference, CellAddress, CellError,
    CellRange, CellStore,
};
use std::cmp::Ordering;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// Row-major block of cell values, produced by evaluating a range
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Convert to number for arithmetic
    ///
    /// Text is read leniently (longest numeric prefix, else `0`). Errors and
    /// arrays have no numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::Text(s) => Some(lenient_number(s)),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Error(_) | FormulaValue::Array(_) => None,
        }
    }

    /// Convert to boolean
    ///
    /// Text counts when it spells TRUE/FALSE or is entirely numeric.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    parse_number(s).map(|n| n != 0.0)
                }
            }
            FormulaValue::Error(_) | FormulaValue::Array(_) => None,
        }
    }

    /// Convert to string (also the display form)
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Value of a cell given its effective text
    pub fn from_cell_text(text: &str) -> Self {
        if text.is_empty() {
            FormulaValue::Empty
        } else {
            FormulaValue::Text(text.to_string())
        }
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Cell store for reference lookups
    pub cells: Option<&'a dyn CellStore>,
    /// Cell holding the formula being evaluated
    pub current_cell: Option<CellAddress>,
    /// Date formats and clock
    pub settings: &'a EvaluationSettings,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(
        cells: &'a dyn CellStore,
        current_cell: Option<CellAddress>,
        settings: &'a EvaluationSettings,
    ) -> Self {
        Self {
            cells: Some(cells),
            current_cell,
            settings,
        }
    }

    /// Create a simple context without cells (for testing)
    pub fn simple() -> EvaluationContext<'static> {
        EvaluationContext {
            cells: None,
            current_cell: None,
            settings: EvaluationSettings::shared_default(),
        }
    }

    /// Get a cell's value: its effective text, or empty
    pub fn get_cell_value(&self, addr: CellAddress) -> FormulaValue {
        match self.cells {
            Some(cells) => FormulaValue::from_cell_text(cells.text_of(&addr.to_a1_string())),
            None => FormulaValue::Empty,
        }
    }

    /// Get a range of cell values as a row-major array
    pub fn get_range_values(&self, range: &CellRange) -> FormulaValue {
        let cols = range.col_count() as usize;
        let mut rows = Vec::new();
        let mut row = Vec::with_capacity(cols);
        for addr in range.cells() {
            row.push(self.get_cell_value(addr));
            if row.len() == cols {
                rows.push(std::mem::replace(&mut row, Vec::with_capacity(cols)));
            }
        }
        FormulaValue::Array(rows)
    }
}

/// Evaluate a formula to its display string
///
/// Text that does not start with `=` is a literal and comes back unchanged.
/// Failures never escape: they are rendered as error codes (`#VALUE!`,
/// `#N/A`, `#NAME?`, `#REF!`, `#ERROR!`).
///
/// # Example
/// ```rust
/// use sheetcalc_core::Sheet;
/// use sheetcalc_formula::evaluate_formula;
///
/// let mut sheet = Sheet::new();
/// sheet.set_input("A1", "10").unwrap();
///
/// assert_eq!(evaluate_formula("=IF(A1>5,\"big\",\"small\")", "B1", &sheet), "big");
/// assert_eq!(evaluate_formula("=ROUND(5)", "B1", &sheet), "#VALUE!");
/// ```
pub fn evaluate_formula(formula: &str, current_cell_id: &str, cells: &dyn CellStore) -> String {
    evaluate_formula_with(
        formula,
        current_cell_id,
        cells,
        EvaluationSettings::shared_default(),
    )
}

/// Evaluate a formula to its display string with explicit settings
pub fn evaluate_formula_with(
    formula: &str,
    current_cell_id: &str,
    cells: &dyn CellStore,
    settings: &EvaluationSettings,
) -> String {
    if !formula.starts_with('=') {
        return formula.to_string();
    }

    let ctx = EvaluationContext::new(cells, parse_reference(current_cell_id), settings);

    match parse_formula(formula) {
        // A lone reference shows the referenced cell as a number
        Ok(FormulaExpr::CellRef(addr)) => format_number(cells.number_of(&addr.to_a1_string())),
        Ok(ast) => display(evaluate(&ast, &ctx), current_cell_id),
        Err(FormulaError::Parse(reason)) => {
            log::trace!(
                "{}: falling back to plain arithmetic ({})",
                current_cell_id,
                reason
            );
            evaluate_arithmetic_fallback(formula, &ctx, current_cell_id)
        }
        Err(e) => display(Err(e), current_cell_id),
    }
}

/// Keep only digits, `+ - * / ( ) .` and evaluate what is left
fn evaluate_arithmetic_fallback(formula: &str, ctx: &EvaluationContext, cell_id: &str) -> String {
    let body = formula.trim_start_matches('=');
    let sanitized = regex_replace_all!(r"[^0-9+\-*/().]", body, "");
    if sanitized.is_empty() {
        return CellError::Name.to_string();
    }

    let result = parse_formula(&format!("={}", sanitized))
        .map_err(|e| FormulaError::Evaluation(e.to_string()))
        .and_then(|ast| evaluate(&ast, ctx));
    display(result, cell_id)
}

fn display(result: FormulaResult<FormulaValue>, cell_id: &str) -> String {
    match result {
        Ok(value) => value.as_string(),
        Err(e) => {
            log::debug!("{}: {}", cell_id, e);
            e.to_cell_error().to_string()
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::Text(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),

        // === References ===
        FormulaExpr::CellRef(addr) => Ok(ctx.get_cell_value(*addr)),
        FormulaExpr::RangeRef(range) => Ok(ctx.get_range_values(range)),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { func, args } => evaluate_function(*func, args, ctx),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    // Evaluate operands first
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    // Propagate errors
    if let Some(e) = left_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if matches!(left_val, FormulaValue::Array(_)) || matches!(right_val, FormulaValue::Array(_)) {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let arithmetic = |f: fn(f64, f64) -> f64| -> FormulaResult<FormulaValue> {
        let l = left_val
            .as_number()
            .ok_or_else(|| FormulaError::Evaluation("Expected number".into()))?;
        let r = right_val
            .as_number()
            .ok_or_else(|| FormulaError::Evaluation("Expected number".into()))?;
        finite(f(l, r))
    };

    match op {
        // Arithmetic operators
        BinaryOperator::Add => arithmetic(|l, r| l + r),
        BinaryOperator::Subtract => arithmetic(|l, r| l - r),
        BinaryOperator::Multiply => arithmetic(|l, r| l * r),
        BinaryOperator::Divide => {
            if right_val.as_number() == Some(0.0) {
                return Err(FormulaError::Evaluation("Division by zero".into()));
            }
            arithmetic(|l, r| l / r)
        }
        BinaryOperator::Power => arithmetic(f64::powf),

        // Comparison operators
        BinaryOperator::Equal => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) == Ordering::Equal,
        )),
        BinaryOperator::NotEqual => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) != Ordering::Equal,
        )),
        BinaryOperator::LessThan => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) == Ordering::Less,
        )),
        BinaryOperator::LessEqual => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) != Ordering::Greater,
        )),
        BinaryOperator::GreaterThan => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) == Ordering::Greater,
        )),
        BinaryOperator::GreaterEqual => Ok(FormulaValue::Boolean(
            compare_values(&left_val, &right_val) != Ordering::Less,
        )),

        // Concatenation
        BinaryOperator::Concat => {
            let l = left_val.as_string();
            let r = right_val.as_string();
            Ok(FormulaValue::Text(l + &r))
        }
    }
}

fn finite(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(FormulaError::Evaluation(format!(
            "Arithmetic result is not finite ({})",
            n
        )))
    }
}

/// Compare two non-error scalar values
///
/// A number against anything compares numerically, reading text leniently.
/// Two texts compare numerically when both are entirely numeric, otherwise
/// case-insensitively.
pub(crate) fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    use FormulaValue::*;

    let numeric = |l: &FormulaValue, r: &FormulaValue| {
        let l = l.as_number().unwrap_or(0.0);
        let r = r.as_number().unwrap_or(0.0);
        l.partial_cmp(&r).unwrap_or(Ordering::Equal)
    };

    match (left, right) {
        (Number(_) | Boolean(_), _) | (_, Number(_) | Boolean(_)) => numeric(left, right),
        (Text(l), Text(r)) => match (parse_number(l), parse_number(r)) {
            (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            _ => l.to_lowercase().cmp(&r.to_lowercase()),
        },
        _ => left
            .as_string()
            .to_lowercase()
            .cmp(&right.as_string().to_lowercase()),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = evaluate(operand, ctx)?;

    // Propagate errors
    if let Some(e) = val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let n = match val.as_number() {
        Some(n) => n,
        None => return Ok(FormulaValue::Error(CellError::Value)),
    };

    match op {
        UnaryOperator::Negate => Ok(FormulaValue::Number(-n)),
        UnaryOperator::Percent => Ok(FormulaValue::Number(n / 100.0)),
    }
}

/// Evaluate a function call
fn evaluate_function(
    func: Function,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    // Check argument count
    if args.len() < func.min_args() {
        return Err(FormulaError::ArgumentCount {
            function: func.name().to_string(),
            expected: format!("at least {}", func.min_args()),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args() {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: func.name().to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    match functions::implementation(func) {
        Implementation::Lazy(implementation) => implementation(args, ctx),
        Implementation::Eager(implementation) => {
            let evaluated_args = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<FormulaResult<Vec<_>>>()?;
            implementation(&evaluated_args, ctx)
        }
    }
}
