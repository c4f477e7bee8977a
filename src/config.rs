use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::model::{JsonOrient, SheetSelector, DEFAULT_SHEET_NAME};
use crate::error::{LoaderError, Result};

/// Defaults applied by the dispatching entry points
/// ([`load_multiple_datasets_with`](crate::load_multiple_datasets_with) and
/// [`save_auto_with`](crate::save_auto_with)).
///
/// Every field is optional in the serialized form:
///
/// ```json
/// { "encoding": "latin1", "sheet": "Sales", "indent": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Encoding label used for CSV sources.
    pub encoding: String,
    /// Worksheet read from spreadsheet sources.
    pub sheet: SheetSelector,
    /// Worksheet name given to written spreadsheets.
    pub sheet_name: String,
    /// Write the row index as a leading column (CSV and spreadsheets).
    pub include_index: bool,
    /// Layout of written JSON.
    pub orient: JsonOrient,
    /// Pretty-print written JSON with this many spaces.
    pub indent: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            sheet: SheetSelector::default(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            include_index: false,
            orient: JsonOrient::default(),
            indent: None,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::io(format!("reading config {}", path.display()), e))?;
        serde_json::from_str(&content)
            .map_err(|e| LoaderError::io(format!("parsing config {}", path.display()), e))
    }

    /// Save configuration to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LoaderError::io("serializing config", e))?;
        std::fs::write(path, content)
            .map_err(|e| LoaderError::io(format!("writing config {}", path.display()), e))
    }
}
