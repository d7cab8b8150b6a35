//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellData`] - A cell's raw value, formula and cached display value
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`CellError`] - Error codes rendered in place of a formula result

mod address;
mod data;
mod value;

pub use address::{
    expand_range, format_column_label, parse_reference, CellAddress, CellRange,
    CellRangeIterator,
};
pub use data::CellData;
pub use value::CellError;
