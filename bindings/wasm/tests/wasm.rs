//! WASM binding tests
//!
//! Run with: wasm-pack test --node

#![cfg(target_arch = "wasm32")]

use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use sheetcalc_wasm::*;

wasm_bindgen_test_configure!(run_in_browser);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Cell<'a> {
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<&'a str>,
}

fn cells(entries: &[(&str, &str)]) -> JsValue {
    let map: BTreeMap<&str, Cell> = entries
        .iter()
        .map(|&(key, raw)| {
            let formula = raw.starts_with('=').then_some(raw);
            (key, Cell { value: raw, formula })
        })
        .collect();
    map.serialize(&serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true))
        .unwrap()
}

fn changed(value: JsValue) -> BTreeMap<String, String> {
    serde_wasm_bindgen::from_value(value).unwrap()
}

// =============================================================================
// Engine function tests
// =============================================================================

#[wasm_bindgen_test]
fn test_evaluate_formula() {
    let store = cells(&[("A1", "1"), ("A2", "2"), ("A3", "x")]);
    assert_eq!(evaluate_formula("=SUM(A1:A3)", "D1", store).unwrap(), "3");
}

#[wasm_bindgen_test]
fn test_evaluate_formula_literal() {
    assert_eq!(
        evaluate_formula("plain text", "A1", JsValue::UNDEFINED).unwrap(),
        "plain text"
    );
}

#[wasm_bindgen_test]
fn test_evaluate_formula_error_codes() {
    assert_eq!(
        evaluate_formula("=ROUND(5)", "A1", JsValue::NULL).unwrap(),
        "#VALUE!"
    );
    assert_eq!(
        evaluate_formula("=NOPE(1)", "A1", JsValue::NULL).unwrap(),
        "#NAME?"
    );
}

#[wasm_bindgen_test]
fn test_evaluate_formula_rejects_bad_store() {
    assert!(evaluate_formula("=1", "A1", JsValue::from_f64(3.0)).is_err());
}

#[wasm_bindgen_test]
fn test_parse_cell_reference() {
    let value = parse_cell_reference("c14").unwrap();
    let coords: BTreeMap<String, u32> = serde_wasm_bindgen::from_value(value).unwrap();
    assert_eq!(coords["col"], 2);
    assert_eq!(coords["row"], 13);

    assert!(parse_cell_reference("hello").unwrap().is_null());
}

#[wasm_bindgen_test]
fn test_expand_range() {
    assert_eq!(expand_range("B2:A1"), vec!["A1", "B1", "A2", "B2"]);
    assert!(expand_range("A1").is_empty());
    assert_eq!(format_column_label(26), "AA");
}

#[wasm_bindgen_test]
fn test_recalculate_returns_changes() {
    let store = cells(&[("A1", "10"), ("A2", "=A1*2"), ("A3", "=A2+1")]);
    let result = changed(recalculate(store, Some("dependents".into())).unwrap());
    assert_eq!(result["A2"], "20");
    assert_eq!(result["A3"], "21");
}

#[wasm_bindgen_test]
fn test_recalculate_unknown_mode() {
    assert!(recalculate(JsValue::NULL, Some("sideways".into())).is_err());
}

// =============================================================================
// Spreadsheet tests
// =============================================================================

#[wasm_bindgen_test]
fn test_spreadsheet_commit() {
    let mut sheet = Spreadsheet::new();
    sheet.set_input("A1", "2").unwrap();
    let result = changed(sheet.set_input("B1", "=A1*21").unwrap());
    assert_eq!(result["B1"], "42");

    let result = changed(sheet.set_input("A1", "1").unwrap());
    assert_eq!(result["B1"], "21");
    assert_eq!(sheet.get_text("B1"), "21");
    assert_eq!(sheet.dependents_of("A1"), vec!["B1"]);
    assert_eq!(sheet.size(), 2);
}

#[wasm_bindgen_test]
fn test_spreadsheet_from_cells() {
    let store = cells(&[("a1", "5"), ("B1", "=A1+1")]);
    let sheet = Spreadsheet::from_cells(store).unwrap();
    assert_eq!(sheet.get_text("B1"), "6");
    assert_eq!(sheet.get_text("b1"), "6");
    assert_eq!(sheet.get_text("a1"), "5");
    assert!(sheet.dependency_ordered());
}
