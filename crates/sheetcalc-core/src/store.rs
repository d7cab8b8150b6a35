//! Cell stores
//!
//! The evaluator only ever reads cells, through [`CellStore`]. Host applications
//! can pass their own keyed maps; [`Sheet`] is the store the recalculation
//! driver mutates.

use crate::cell::{parse_reference, CellAddress, CellData};
use crate::error::{Error, Result};
use crate::number::lenient_number;
use ahash::AHashMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Read-only access to cells by key (e.g. `"C14"`)
pub trait CellStore {
    /// Look up a cell by key
    fn cell(&self, key: &str) -> Option<&CellData>;

    /// Iterate over every stored cell, in no particular order
    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &CellData)> + '_>;

    /// Effective text of a cell: display value, else raw value, else `""`
    fn text_of(&self, key: &str) -> &str {
        self.cell(key).map(CellData::text).unwrap_or("")
    }

    /// Effective text read as a number; missing or unparseable cells read as `0`
    fn number_of(&self, key: &str) -> f64 {
        lenient_number(self.text_of(key))
    }

    /// Addresses and keys of all formula cells, in row-major order
    ///
    /// Keys that are not cell references are skipped.
    fn formula_cells(&self) -> Vec<(CellAddress, String)> {
        let mut cells: Vec<(CellAddress, String)> = self
            .entries()
            .filter(|(_, data)| data.is_formula())
            .filter_map(|(key, _)| parse_reference(key).map(|addr| (addr, key.to_string())))
            .collect();
        cells.sort();
        cells
    }
}

impl<S: BuildHasher> CellStore for HashMap<String, CellData, S> {
    fn cell(&self, key: &str) -> Option<&CellData> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &CellData)> + '_> {
        Box::new(self.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl CellStore for BTreeMap<String, CellData> {
    fn cell(&self, key: &str) -> Option<&CellData> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &CellData)> + '_> {
        Box::new(self.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

/// A mutable sheet of cells keyed by normalized A1 references
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Sheet {
    cells: AHashMap<String, CellData>,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit raw user input to a cell
    ///
    /// Input starting with `=` becomes a formula whose display value is
    /// computed on the next recalculation. Anything else is a plain value and
    /// clears any previous formula and display value.
    pub fn set_input(&mut self, key: &str, raw: &str) -> Result<()> {
        let key = Self::normalize_key(key)?;
        self.cells.insert(key, CellData::from_input(raw));
        Ok(())
    }

    /// Insert a cell as-is (e.g. loaded from a host snapshot)
    pub fn insert(&mut self, key: &str, data: CellData) -> Result<Option<CellData>> {
        let key = Self::normalize_key(key)?;
        Ok(self.cells.insert(key, data))
    }

    /// Write back a computed display value, returning whether it changed
    pub fn set_display_value(&mut self, key: &str, display: &str) -> Result<bool> {
        let key = Self::normalize_key(key)?;
        match self.cells.get_mut(&key) {
            Some(cell) if cell.is_formula() => Ok(cell.set_display_value(display)),
            _ => Err(Error::NotAFormula(key)),
        }
    }

    /// Get a cell by key, in any spelling `set_input` accepts
    pub fn get(&self, key: &str) -> Option<&CellData> {
        self.cells.get(key).or_else(|| {
            let key = Self::normalize_key(key).ok()?;
            self.cells.get(&key)
        })
    }

    /// Remove a cell
    pub fn remove(&mut self, key: &str) -> Option<CellData> {
        let key = Self::normalize_key(key).ok()?;
        self.cells.remove(&key)
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the sheet holds no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &str, &CellData)> {
        let mut cells: Vec<(CellAddress, &str, &CellData)> = self
            .cells
            .iter()
            .filter_map(|(key, data)| parse_reference(key).map(|addr| (addr, key.as_str(), data)))
            .collect();
        cells.sort_by_key(|(addr, _, _)| *addr);
        cells.into_iter()
    }

    fn normalize_key(key: &str) -> Result<String> {
        CellAddress::parse(key).map(|addr| addr.to_a1_string())
    }
}

impl CellStore for Sheet {
    fn cell(&self, key: &str) -> Option<&CellData> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &CellData)> + '_> {
        Box::new(self.cells.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Sheet {
    /// Build a sheet from `(key, raw input)` pairs, skipping invalid keys
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let cells = iter
            .into_iter()
            .filter_map(|(key, raw)| {
                let addr = CellAddress::parse(key.as_ref()).ok()?;
                Some((addr.to_a1_string(), CellData::from_input(raw.as_ref())))
            })
            .collect();
        Sheet { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_input_maintains_formula_invariant() {
        let mut sheet = Sheet::new();
        sheet.set_input("a1", "=1+1").unwrap();
        assert!(sheet.get("A1").unwrap().is_formula());

        sheet.set_display_value("A1", "2").unwrap();
        assert_eq!(sheet.text_of("A1"), "2");

        // Overwriting with a plain value drops formula and cached result
        sheet.set_input("A1", "hello").unwrap();
        let cell = sheet.get("A1").unwrap();
        assert_eq!(cell.formula, None);
        assert_eq!(cell.display_value, None);
        assert_eq!(sheet.text_of("A1"), "hello");
    }

    #[test]
    fn test_set_input_rejects_bad_keys() {
        let mut sheet = Sheet::new();
        assert!(matches!(
            sheet.set_input("not a key", "1"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_lookups_normalize_keys() {
        let mut sheet = Sheet::new();
        sheet.set_input("a1", "x").unwrap();
        sheet.set_input("b2", "=1").unwrap();

        assert!(sheet.get("a1").is_some());
        assert_eq!(sheet.text_of("a1"), "x");
        assert_eq!(sheet.text_of("A1"), "x");
        assert!(sheet.cell("b2").unwrap().is_formula());
        assert!(sheet.cell("B2").unwrap().is_formula());
        assert_eq!(sheet.get("not a key"), None);
    }

    #[test]
    fn test_collect_skips_bad_keys() {
        let sheet: Sheet = [("a1", "1"), ("bogus", "2"), ("", "3"), ("c3", "=A1")]
            .into_iter()
            .collect();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.text_of("A1"), "1");
        assert!(sheet.get("C3").unwrap().is_formula());
    }

    #[test]
    fn test_set_display_value_requires_formula() {
        let mut sheet = Sheet::new();
        sheet.set_input("B2", "5").unwrap();
        assert!(matches!(
            sheet.set_display_value("B2", "6"),
            Err(Error::NotAFormula(_))
        ));
        assert!(matches!(
            sheet.set_display_value("C3", "6"),
            Err(Error::NotAFormula(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let sheet: Sheet = [("A1", "10"), ("A2", "x"), ("A3", "")].into_iter().collect();
        assert_eq!(sheet.number_of("A1"), 10.0);
        assert_eq!(sheet.number_of("A2"), 0.0);
        assert_eq!(sheet.text_of("A3"), "");
        assert_eq!(sheet.text_of("Z99"), "");
        assert_eq!(sheet.number_of("Z99"), 0.0);
    }

    #[test]
    fn test_formula_cells_row_major() {
        let sheet: Sheet = [
            ("B2", "=1"),
            ("A2", "=2"),
            ("C1", "=3"),
            ("A1", "plain"),
        ]
        .into_iter()
        .collect();

        let keys: Vec<String> = sheet.formula_cells().into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["C1", "A2", "B2"]);
    }

    #[test]
    fn test_iter_row_major() {
        let sheet: Sheet = [("B1", "b"), ("A2", "c"), ("A1", "a")].into_iter().collect();
        let keys: Vec<&str> = sheet.iter().map(|(_, k, _)| k).collect();
        assert_eq!(keys, vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn test_hashmap_store() {
        let mut cells = HashMap::new();
        cells.insert("A1".to_string(), CellData::new("7"));
        cells.insert("note".to_string(), CellData::from_input("=A1"));
        assert_eq!(cells.number_of("A1"), 7.0);
        assert!(cells.formula_cells().is_empty());
    }
}
