use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DdlResult;

use super::object::CatalogObject;
use super::relationship::Link;

/// On-disk form of the catalog: `catalog.json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CatalogFile {
    pub(crate) next_id: u64,
    #[serde(default)]
    pub(crate) objects: Vec<CatalogObject>,
    #[serde(default)]
    pub(crate) links: Vec<Link>,
}

impl CatalogFile {
    pub(crate) fn save_to_path(&self, path: &Path) -> DdlResult<()> {
        let payload = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Loads catalog metadata from disk; `None` when no catalog was written yet.
    pub(crate) fn load_from_path(path: &Path) -> DdlResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }
}
