use serde::{Deserialize, Serialize};

/// Admission control limits for report queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum number of distinct report groups a single query may return.
    ///
    /// Queries matching more groups are rejected with `RowLimitExceeded`
    /// rather than truncated; callers narrow their filters instead of paging.
    /// Default: 10.
    #[serde(default = "default_max_report_groups")]
    pub max_report_groups: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_report_groups: default_max_report_groups(),
        }
    }
}

impl LimitsConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.max_report_groups == 0 {
            return Err("limits.max_report_groups must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Group cap applied when no limits are configured.
pub const DEFAULT_MAX_REPORT_GROUPS: usize = 10;

fn default_max_report_groups() -> usize {
    DEFAULT_MAX_REPORT_GROUPS
}
