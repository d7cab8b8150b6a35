//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the types the evaluator reads from:
//! - [`CellData`] - A cell's raw value, optional formula and cached display value
//! - [`CellAddress`] and [`CellRange`] - Cell addressing, ranges and row-major expansion
//! - [`CellError`] - The spreadsheet error codes shown in place of a result
//! - [`CellStore`] and [`Sheet`] - Read access to a keyed cell store
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{expand_range, parse_reference, CellStore, Sheet};
//!
//! let addr = parse_reference("B2").unwrap();
//! assert_eq!((addr.col, addr.row), (1, 1));
//!
//! assert_eq!(expand_range("B2:A1"), vec!["A1", "B1", "A2", "B2"]);
//!
//! let mut sheet = Sheet::new();
//! sheet.set_input("A1", "42").unwrap();
//! assert_eq!(sheet.number_of("A1"), 42.0);
//! ```

pub mod cell;
pub mod error;
pub mod number;
pub mod store;

// Re-exports for convenience
pub use cell::{
    expand_range, format_column_label, parse_reference, CellAddress, CellData, CellError,
    CellRange, CellRangeIterator,
};
pub use error::{Error, Result};
pub use number::{format_number, lenient_number, parse_number, parse_number_prefix};
pub use store::{CellStore, Sheet};
