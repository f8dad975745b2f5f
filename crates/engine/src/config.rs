//! Registration-time engine configuration.
//!
//! Established once when the query service is constructed and read-only
//! afterwards. A per-call `page` parameter overrides the configured
//! default wholesale.

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default pagination applied when a call omits an explicit page.
    /// When absent, unpaged calls return all matching rows and no page
    /// count is computed.
    #[serde(default)]
    pub pagination: Option<PageDefaults>,

    /// Hard cap on any effective page limit. Requests above the cap are
    /// clamped with a warning.
    #[serde(default)]
    pub max_limit: Option<u64>,
}

/// Default limit/offset pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageDefaults {
    /// Rows per page. Must be at least 1.
    pub limit: u64,

    /// Rows to skip (default: 0).
    #[serde(default)]
    pub offset: u64,
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(pagination) = &self.pagination
            && pagination.limit == 0
        {
            return Err("default pagination limit must be at least 1".to_string());
        }
        if self.max_limit == Some(0) {
            return Err("max_limit must be at least 1".to_string());
        }
        Ok(())
    }
}
