//! Formula Abstract Syntax Tree types

use sheetcalc_core::{CellAddress, CellError, CellRange};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal, case preserved
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(CellError),

    // === References ===
    /// Single cell reference
    CellRef(CellAddress),
    /// Range reference, normalized to top-left/bottom-right
    RangeRef(CellRange),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        func: Function,
        args: Vec<FormulaExpr>,
    },
}

impl FormulaExpr {
    /// Check if the expression calls a volatile function anywhere
    pub fn is_volatile(&self) -> bool {
        match self {
            FormulaExpr::Function { func, args } => {
                func.is_volatile() || args.iter().any(FormulaExpr::is_volatile)
            }
            FormulaExpr::BinaryOp { left, right, .. } => left.is_volatile() || right.is_volatile(),
            FormulaExpr::UnaryOp { operand, .. } => operand.is_volatile(),
            FormulaExpr::Number(_)
            | FormulaExpr::String(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Error(_)
            | FormulaExpr::CellRef(_)
            | FormulaExpr::RangeRef(_) => false,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

/// The recognized built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Aggregates over a single range
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountA,
    // Math
    Round,
    // Text
    Concat,
    Len,
    Upper,
    Lower,
    // Date
    Today,
    Now,
    // Logical
    If,
    // Lookup
    VLookup,
}

impl Function {
    /// Every recognized function
    pub const ALL: [Function; 15] = [
        Function::Sum,
        Function::Average,
        Function::Min,
        Function::Max,
        Function::Count,
        Function::CountA,
        Function::Round,
        Function::Concat,
        Function::Len,
        Function::Upper,
        Function::Lower,
        Function::Today,
        Function::Now,
        Function::If,
        Function::VLookup,
    ];

    /// Look up a function by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.into_iter().find(|f| f.name() == upper)
    }

    /// Function name (uppercase)
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Average => "AVERAGE",
            Function::Min => "MIN",
            Function::Max => "MAX",
            Function::Count => "COUNT",
            Function::CountA => "COUNTA",
            Function::Round => "ROUND",
            Function::Concat => "CONCAT",
            Function::Len => "LEN",
            Function::Upper => "UPPER",
            Function::Lower => "LOWER",
            Function::Today => "TODAY",
            Function::Now => "NOW",
            Function::If => "IF",
            Function::VLookup => "VLOOKUP",
        }
    }

    /// Minimum arguments
    pub fn min_args(&self) -> usize {
        match self {
            Function::Today | Function::Now => 0,
            Function::Sum
            | Function::Average
            | Function::Min
            | Function::Max
            | Function::Count
            | Function::CountA
            | Function::Concat
            | Function::Len
            | Function::Upper
            | Function::Lower => 1,
            Function::Round => 2,
            Function::If | Function::VLookup => 3,
        }
    }

    /// Maximum arguments (None = unlimited)
    pub fn max_args(&self) -> Option<usize> {
        match self {
            Function::Concat => None,
            Function::VLookup => Some(4),
            other => Some(other.min_args()),
        }
    }

    /// Is volatile (recalculates every time)
    pub fn is_volatile(&self) -> bool {
        matches!(self, Function::Today | Function::Now)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
