//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Reference resolver
    expand_range,
    format_column_label,
    parse_reference,
    // Evaluation
    evaluate_formula,
    evaluate_formula_with,
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CellAddress,
    // Cell types
    CellData,
    CellError,
    CellRange,
    CellStore,
    Clock,
    // Error types
    Error,
    EvaluationSettings,
    RecalcMode,
    Result,
    // Main types
    Sheet,
    // Extension traits
    SheetCalculationExt,
};
