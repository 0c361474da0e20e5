use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs;
use std::path::Path;

use crate::error::{DdlError, DdlResult};

pub const CONFIG_FILE: &str = "engine.json";

/// Engine settings read from `engine.json` in the database directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub current_user: String,
    pub default_schema: String,
    /// When set, ALTER TABLE ADD COLUMN keeps existing index roots.
    pub alter_table_add_column_incremental: bool,
    pub test_table_reload_sleep_ms: Option<u64>,
    pub test_table_reload_crash: bool,
    pub test_table_reload_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            current_user: "sa".to_string(),
            default_schema: "public".to_string(),
            alter_table_add_column_incremental: false,
            test_table_reload_sleep_ms: None,
            test_table_reload_crash: false,
            test_table_reload_failure: false,
        }
    }
}

impl EngineConfig {
    pub fn load_from_path(path: &Path) -> DdlResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| DdlError::Config(format!("{}: {e}", path.display())))
    }

    pub fn load_from_dir(dir: &Path) -> DdlResult<Self> {
        Self::load_from_path(&dir.join(CONFIG_FILE))
    }
}

/// One-shot instrumentation hooks for the table reload protocol. Each trap
/// resets itself the first time it is taken.
#[derive(Debug, Default)]
pub struct TestTraps {
    reload_sleep_ms: Cell<Option<u64>>,
    reload_crash: Cell<bool>,
    reload_failure: Cell<bool>,
}

impl TestTraps {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            reload_sleep_ms: Cell::new(config.test_table_reload_sleep_ms),
            reload_crash: Cell::new(config.test_table_reload_crash),
            reload_failure: Cell::new(config.test_table_reload_failure),
        }
    }

    /// Delay before the unlocked reload step.
    pub fn arm_sleep(&self, millis: u64) {
        self.reload_sleep_ms.set(Some(millis));
    }

    /// Crash at the start of completion, leaving the recovery marker behind.
    pub fn arm_crash(&self) {
        self.reload_crash.set(true);
    }

    /// Failure right after the unlocked reload step.
    pub fn arm_failure(&self) {
        self.reload_failure.set(true);
    }

    pub fn take_sleep(&self) -> Option<u64> {
        self.reload_sleep_ms.take()
    }

    pub fn take_crash(&self) -> bool {
        self.reload_crash.replace(false)
    }

    pub fn take_failure(&self) -> bool {
        self.reload_failure.replace(false)
    }

    pub fn is_armed(&self) -> bool {
        let sleep = self.reload_sleep_ms.get().is_some();
        sleep || self.reload_crash.get() || self.reload_failure.get()
    }
}
