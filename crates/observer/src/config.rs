//! Watcher configuration.

use dom::BulkRemoval;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::support::bulk_removal_is_buggy;

/// When to look for added elements that silently lost their parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanSweep {
    /// Only on trees whose bulk removal is known to orphan descendants.
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Re-check elements whose attributes change.
    pub attributes: bool,
    /// Restrict attribute observation to these names.
    pub attribute_filter: Option<Vec<String>>,
    /// Listen for value-change events on the root.
    pub change_events: bool,
    pub change_event_type: String,
    pub orphan_sweep: OrphanSweep,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            attributes: true,
            attribute_filter: None,
            change_events: true,
            change_event_type: "change".to_string(),
            orphan_sweep: OrphanSweep::Auto,
        }
    }
}

impl WatcherConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn sweeps_detached(&self, bulk_removal: BulkRemoval) -> bool {
        match self.orphan_sweep {
            OrphanSweep::Auto => bulk_removal_is_buggy(bulk_removal),
            OrphanSweep::Always => true,
            OrphanSweep::Never => false,
        }
    }
}
