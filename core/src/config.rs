//! Display configuration, loaded from an optional JSON file.

use crate::{error::TrackResult, formatter::TokenStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// How concrete dates render. Both styles are day-first.
    pub token_style: TokenStyle,
    /// Whether range-filtered views exclude customers with no data
    /// inside the requested window.
    pub drop_empty_rows: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            token_style: TokenStyle::DayMonthNumeric,
            drop_empty_rows: true,
        }
    }
}

impl DisplayConfig {
    /// Read config from a JSON file. A missing file is not an error;
    /// defaults apply; a present-but-invalid file is.
    pub fn load(path: impl AsRef<Path>) -> TrackResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("no display config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(anyhow::Error::from)?;
        Ok(serde_json::from_str(&text)?)
    }
}
