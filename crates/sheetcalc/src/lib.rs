//! # sheetcalc
//!
//! A spreadsheet formula evaluation engine.
//!
//! Given a formula string, the cell it lives in and a readable cell store,
//! sheetcalc produces the string to display. Given a cell edit, it works out
//! which formula cells must be re-evaluated and writes their new display
//! values back.
//!
//! ## Features
//!
//! - A1 references and row-major range expansion
//! - Arithmetic with standard precedence, comparisons and `&` concatenation
//! - SUM, AVERAGE, MIN, MAX, COUNT, COUNTA, ROUND, CONCAT, LEN, UPPER, LOWER,
//!   TODAY, NOW, IF and VLOOKUP
//! - Spreadsheet error codes instead of failures (`#VALUE!`, `#N/A`, `#NAME?`,
//!   `#REF!`, `#ERROR!`)
//! - Full-scan or dependency-ordered recalculation
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Sheet::new();
//! sheet.set_input("A1", "10").unwrap();
//! sheet.set_input("A2", "20").unwrap();
//! sheet.set_input("A3", "=SUM(A1:A2)").unwrap();
//!
//! sheet.calculate().unwrap();
//! assert_eq!(sheet.text_of("A3"), "30");
//!
//! assert_eq!(evaluate_formula("=A3*2", "B1", &sheet), "60");
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, RecalcMode, SheetCalculationExt};

// Re-export core types
pub use sheetcalc_core::{
    expand_range, format_column_label, format_number, lenient_number, parse_number,
    parse_number_prefix, parse_reference, CellAddress, CellData, CellError, CellRange,
    CellRangeIterator, CellStore, Error, Result, Sheet,
};

// Re-export formula types
pub use sheetcalc_formula::{
    evaluate, evaluate_formula, evaluate_formula_with, extract_references, parse_formula, Clock,
    DependencyGraph, EvaluationContext, EvaluationSettings, FormulaError, FormulaExpr,
    FormulaResult, FormulaValue, Function,
};
