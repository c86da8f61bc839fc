use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backing dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Path to the CSV file holding the usage and cost rows.
    /// Read once at startup.
    #[serde(default = "default_dataset_path")]
    pub path: String,

    /// Tag columns matched by the `tag1` and `tag2` query parameters.
    #[serde(default)]
    pub tag_filters: TagFilterColumns,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            tag_filters: TagFilterColumns::default(),
        }
    }
}

impl DatasetConfig {
    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("dataset.path must not be empty".to_string());
        }
        self.tag_filters.validate()
    }
}

fn default_dataset_path() -> String {
    "cost_report.csv".to_string()
}

/// Column names searched by the two tag substring filters.
///
/// Each must name a tag column, i.e. contain the `:` key/value separator.
/// A column that is absent from the loaded dataset leaves its filter inert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagFilterColumns {
    #[serde(default = "default_tag1_column")]
    pub tag1: String,

    #[serde(default = "default_tag2_column")]
    pub tag2: String,
}

impl Default for TagFilterColumns {
    fn default() -> Self {
        Self {
            tag1: default_tag1_column(),
            tag2: default_tag2_column(),
        }
    }
}

impl TagFilterColumns {
    fn validate(&self) -> Result<(), String> {
        for (name, column) in [("tag1", &self.tag1), ("tag2", &self.tag2)] {
            if !crate::table::is_tag_column(column) {
                return Err(format!(
                    "dataset.tag_filters.{name} = \"{column}\" is not a tag column name \
                     (expected a `key:value` style header)"
                ));
            }
        }
        Ok(())
    }
}

fn default_tag1_column() -> String {
    "key1:value".to_string()
}

fn default_tag2_column() -> String {
    "key2:value".to_string()
}
