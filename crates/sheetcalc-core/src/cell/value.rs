//! Cell error codes

use std::fmt;

/// Spreadsheet error codes, rendered in place of a formula result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #VALUE! - Wrong type or number of arguments
    Value,
    /// #N/A - Lookup found no match
    Na,
    /// #NAME? - Unrecognized function or expression
    Name,
    /// #REF! - Reference outside the addressed block
    Ref,
    /// #ERROR! - Any other evaluation fault
    Error,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Value => "#VALUE!",
            CellError::Na => "#N/A",
            CellError::Name => "#NAME?",
            CellError::Ref => "#REF!",
            CellError::Error => "#ERROR!",
        }
    }

    /// Parse an error string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#VALUE!" => Some(CellError::Value),
            "#N/A" => Some(CellError::Na),
            "#NAME?" => Some(CellError::Name),
            "#REF!" => Some(CellError::Ref),
            "#ERROR!" => Some(CellError::Error),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
