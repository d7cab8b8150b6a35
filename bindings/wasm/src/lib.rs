//! WebAssembly bindings for sheetcalc
//!
//! Exposes the formula engine to JavaScript under camelCase names. Cell stores
//! are plain objects keyed by cell id:
//!
//! ```js
//! const cells = { A1: { value: "10" }, A2: { value: "=A1*2", formula: "=A1*2" } };
//! evaluateFormula("=SUM(A1:A2)", "B1", cells);
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

use sheetcalc::{
    CalculationOptions, CellData, CellStore, RecalcMode, Sheet, SheetCalculationExt,
};

// =============================================================================
// Conversion helpers
// =============================================================================

fn to_js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// Serialize with maps as plain JS objects
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true))
        .map_err(to_js_error)
}

fn cells_from_js(cells: JsValue) -> Result<BTreeMap<String, CellData>, JsError> {
    if cells.is_null() || cells.is_undefined() {
        return Ok(BTreeMap::new());
    }
    serde_wasm_bindgen::from_value(cells)
        .map_err(|e| JsError::new(&format!("Invalid cell store: {}", e)))
}

fn sheet_from_js(cells: JsValue) -> Result<Sheet, JsError> {
    let mut sheet = Sheet::new();
    for (key, cell) in cells_from_js(cells)? {
        sheet.insert(&key, cell).map_err(to_js_error)?;
    }
    Ok(sheet)
}

fn options_for(mode: Option<String>) -> Result<CalculationOptions, JsError> {
    match mode.as_deref() {
        None | Some("full") => Ok(CalculationOptions::full_scan()),
        Some("dependents") => Ok(CalculationOptions::dependents()),
        Some(other) => Err(JsError::new(&format!(
            "Unknown recalculation mode '{}' (expected 'full' or 'dependents')",
            other
        ))),
    }
}

/// Display values of formula cells that differ from `before`
fn changed_display_values(before: &Sheet, after: &Sheet) -> BTreeMap<String, String> {
    after
        .iter()
        .filter(|(_, _, cell)| cell.is_formula())
        .filter(|(_, key, cell)| {
            before.get(key).and_then(|c| c.display_value.as_deref()) != cell.display_value.as_deref()
        })
        .map(|(_, key, cell)| (key.to_string(), cell.text().to_string()))
        .collect()
}

/// Zero-based coordinates of a cell reference
#[derive(Serialize)]
struct Coordinates {
    col: u32,
    row: u32,
}

// =============================================================================
// Engine functions
// =============================================================================

/// Evaluate a formula to its display string
///
/// Never throws for formula problems; those come back as error codes such as
/// `#VALUE!`. Throws only if `cells` is not a valid cell store.
#[wasm_bindgen(js_name = evaluateFormula)]
pub fn evaluate_formula(
    formula: &str,
    current_cell_id: &str,
    cells: JsValue,
) -> Result<String, JsError> {
    let cells = cells_from_js(cells)?;
    Ok(sheetcalc::evaluate_formula(formula, current_cell_id, &cells))
}

/// Parse a reference like `"B2"` into `{col, row}` (zero-based), or `null`
#[wasm_bindgen(js_name = parseCellReference)]
pub fn parse_cell_reference(reference: &str) -> Result<JsValue, JsError> {
    match sheetcalc::parse_reference(reference) {
        Some(addr) => to_js(&Coordinates {
            col: addr.col,
            row: addr.row,
        }),
        None => Ok(JsValue::NULL),
    }
}

/// Expand a range like `"A1:B2"` into cell ids, row-major
#[wasm_bindgen(js_name = expandRange)]
pub fn expand_range(range: &str) -> Vec<String> {
    sheetcalc::expand_range(range)
}

/// Format a zero-based column index as letters (`0` → `"A"`, `26` → `"AA"`)
#[wasm_bindgen(js_name = formatColumnLabel)]
pub fn format_column_label(index: u32) -> String {
    sheetcalc::format_column_label(index)
}

/// Recalculate every formula cell and return `{ [cellId]: displayValue }` for
/// the cells whose display value changed
///
/// `mode` is `"full"` (default) or `"dependents"`.
#[wasm_bindgen]
pub fn recalculate(cells: JsValue, mode: Option<String>) -> Result<JsValue, JsError> {
    let options = options_for(mode)?;
    let before = sheet_from_js(cells)?;
    let mut after = before.clone();
    after
        .calculate_with_options(&options)
        .map_err(to_js_error)?;
    to_js(&changed_display_values(&before, &after))
}

// =============================================================================
// Spreadsheet - stateful JavaScript wrapper
// =============================================================================

/// A cell store owned by the engine, recalculated on every commit
#[wasm_bindgen]
pub struct Spreadsheet {
    inner: Sheet,
    options: CalculationOptions,
}

#[wasm_bindgen]
impl Spreadsheet {
    /// Create an empty spreadsheet that recalculates in dependency order
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: Sheet::new(),
            options: CalculationOptions::dependents(),
        }
    }

    /// Load a cell store and compute every formula
    #[wasm_bindgen(js_name = fromCells)]
    pub fn from_cells(cells: JsValue) -> Result<Spreadsheet, JsError> {
        let mut spreadsheet = Self::new();
        spreadsheet.inner = sheet_from_js(cells)?;
        spreadsheet
            .inner
            .calculate_with_options(&spreadsheet.options)
            .map_err(to_js_error)?;
        Ok(spreadsheet)
    }

    /// Commit raw input to a cell and return the changed display values
    #[wasm_bindgen(js_name = setInput)]
    pub fn set_input(&mut self, key: &str, raw: &str) -> Result<JsValue, JsError> {
        let before = self.inner.clone();
        self.inner
            .commit_input(key, raw, &self.options)
            .map_err(to_js_error)?;
        to_js(&changed_display_values(&before, &self.inner))
    }

    /// Effective text of a cell: display value, else raw value, else `""`
    #[wasm_bindgen(js_name = getText)]
    pub fn get_text(&self, key: &str) -> String {
        self.inner.text_of(key).to_string()
    }

    /// Formula cells that must be re-evaluated when `key` changes
    #[wasm_bindgen(js_name = dependentsOf)]
    pub fn dependents_of(&self, key: &str) -> Vec<String> {
        self.inner.affected_cells(&[key])
    }

    /// Snapshot of every cell as a plain object
    #[wasm_bindgen(js_name = toCells)]
    pub fn to_cells(&self) -> Result<JsValue, JsError> {
        let cells: BTreeMap<&str, &CellData> =
            self.inner.iter().map(|(_, key, cell)| (key, cell)).collect();
        to_js(&cells)
    }

    /// Number of stored cells
    #[wasm_bindgen(getter)]
    pub fn size(&self) -> usize {
        self.inner.len()
    }

    /// Whether recalculation uses the dependency graph
    #[wasm_bindgen(getter, js_name = dependencyOrdered)]
    pub fn dependency_ordered(&self) -> bool {
        self.options.mode == RecalcMode::Dependents
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(start)]
pub fn init() {}
