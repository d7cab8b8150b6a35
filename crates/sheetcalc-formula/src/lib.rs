//! # sheetcalc-formula
//!
//! Formula parser and evaluator for sheetcalc.
//!
//! This crate provides:
//! - Formula parsing (text → AST, with functions resolved to [`Function`])
//! - Formula evaluation (AST → value → display string)
//! - The built-in function library (aggregates, ROUND, text, dates, IF, VLOOKUP)
//! - Dependency tracking for recalculation
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::Sheet;
//! use sheetcalc_formula::evaluate_formula;
//!
//! let mut sheet = Sheet::new();
//! sheet.set_input("A1", "1").unwrap();
//! sheet.set_input("A2", "2").unwrap();
//! sheet.set_input("A3", "x").unwrap();
//!
//! assert_eq!(evaluate_formula("=SUM(A1:A3)", "D1", &sheet), "3");
//! assert_eq!(evaluate_formula("=2+2*3", "D1", &sheet), "8");
//! assert_eq!(evaluate_formula("plain text", "D1", &sheet), "plain text");
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod settings;

pub use ast::{BinaryOperator, FormulaExpr, Function, UnaryOperator};
pub use dependency::{extract_references, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, evaluate_formula, evaluate_formula_with, EvaluationContext, FormulaValue,
};
pub use parser::parse_formula;
pub use settings::{Clock, EvaluationSettings};
