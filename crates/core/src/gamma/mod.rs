use std::fmt;
use std::fs;
use std::path::Path;

use crate::{LedVizError, Result};

/// Precomputed nonlinear brightness lookup shared read-only by every device
/// output that has gamma correction enabled.
///
/// The persisted format is a JSON array of exactly 256 byte values indexed by
/// raw intensity. A malformed or missing table fails at load time; once
/// constructed the table never changes and [`GammaTable::correct`] is a pure
/// indexed lookup.
#[derive(Clone)]
pub struct GammaTable {
    table: [u8; 256],
}

impl GammaTable {
    /// Loads the table from a JSON file at `path`. Fatal to startup on
    /// failure; never called on the per-frame path.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| LedVizError::GammaTable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let values: Vec<u8> =
            serde_json::from_str(&raw).map_err(|err| LedVizError::GammaTable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Self::from_values(&values).map_err(|err| LedVizError::GammaTable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Builds a table from an in-memory slice of exactly 256 entries.
    pub fn from_values(values: &[u8]) -> Result<Self> {
        let table: [u8; 256] = values
            .try_into()
            .map_err(|_| LedVizError::InvalidInput("gamma table must have exactly 256 entries"))?;
        Ok(Self { table })
    }

    /// Maps one raw intensity value through the lookup.
    pub fn correct(&self, value: u8) -> u8 {
        self.table[usize::from(value)]
    }
}

impl fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GammaTable").finish()
    }
}
