//! Cell data as the host application stores it

use crate::number::lenient_number;

/// Complete data for a single cell
///
/// `formula` is present iff the raw input began with `=`. When it is present,
/// `display_value` is the rendered content and `value` is ignored for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct CellData {
    /// Raw text as typed by the user
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: String,
    /// Formula text including the leading `=`
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub formula: Option<String>,
    /// Most recently computed formula result
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub display_value: Option<String>,
}

impl CellData {
    /// Create a plain (non-formula) cell
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            formula: None,
            display_value: None,
        }
    }

    /// Create a cell from raw user input, recognising formulas by their leading `=`
    pub fn from_input<S: Into<String>>(raw: S) -> Self {
        let value = raw.into();
        let formula = value.starts_with('=').then(|| value.clone());
        Self {
            value,
            formula,
            display_value: None,
        }
    }

    /// Check if the cell holds a non-empty formula
    pub fn is_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// The cell's effective text: display value if set, else the raw value
    pub fn text(&self) -> &str {
        self.display_value.as_deref().unwrap_or(&self.value)
    }

    /// The cell's effective text read as a number; `0` when unparseable
    pub fn number(&self) -> f64 {
        lenient_number(self.text())
    }

    /// Store a freshly computed display value, returning whether it changed
    pub fn set_display_value<S: Into<String>>(&mut self, display: S) -> bool {
        let display = display.into();
        if self.display_value.as_deref() == Some(display.as_str()) {
            return false;
        }
        self.display_value = Some(display);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_formula_invariant() {
        let cell = CellData::from_input("=SUM(A1:A3)");
        assert_eq!(cell.formula.as_deref(), Some("=SUM(A1:A3)"));
        assert!(cell.is_formula());

        let cell = CellData::from_input("hello");
        assert_eq!(cell.formula, None);
        assert!(!cell.is_formula());

        let cell = CellData::from_input(" =1+1");
        assert_eq!(cell.formula, None);
    }

    #[test]
    fn test_text_prefers_display_value() {
        let mut cell = CellData::from_input("=1+1");
        assert_eq!(cell.text(), "=1+1");

        cell.set_display_value("2");
        assert_eq!(cell.text(), "2");
        assert_eq!(cell.number(), 2.0);
    }

    #[test]
    fn test_number_is_lenient() {
        assert_eq!(CellData::new("x").number(), 0.0);
        assert_eq!(CellData::new("").number(), 0.0);
        assert_eq!(CellData::new("3.5kg").number(), 3.5);
    }

    #[test]
    fn test_set_display_value_reports_change() {
        let mut cell = CellData::from_input("=A1");
        assert!(cell.set_display_value("1"));
        assert!(!cell.set_display_value("1"));
        assert!(cell.set_display_value("2"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_host_json_shape() {
        let cell: CellData =
            serde_json::from_str(r#"{"value":"=A1","formula":"=A1","displayValue":"3"}"#)
                .unwrap();
        assert_eq!(cell.display_value.as_deref(), Some("3"));
    }
}
