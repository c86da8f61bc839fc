//! In-memory table store for the usage and cost dataset.
//!
//! The dataset is a flat CSV file read once at startup. After loading, the
//! table is immutable and shared read-only between request handlers; a load
//! failure leaves the store in the [`TableStore::Unavailable`] state, which
//! every handler reports instead of querying.

mod consistency;
mod load;

use std::path::PathBuf;

pub use consistency::*;

use crate::config::DatasetConfig;

/// Separator that marks a column header as a tag column (`team:name`).
pub const TAG_SEPARATOR: char = ':';

/// Returns true when a column header names a dynamic tag column.
pub fn is_tag_column(name: &str) -> bool {
    name.contains(TAG_SEPARATOR)
}

/// CSV header names of the fixed columns.
pub mod columns {
    pub const CLUSTER_ID: &str = "Cluster id";
    pub const CLUSTER_NAME: &str = "Cluster name";
    pub const PLAN_TYPE: &str = "Plan Type";
    pub const REGION: &str = "Region";
    pub const START_DATE: &str = "Start date";
    pub const END_DATE: &str = "End date";
    pub const DATABASE_ID: &str = "Database id";
    pub const CHARGE_TYPE: &str = "Charge Type";
    pub const BILLING_UNIT_TYPE: &str = "Billing Unit Type";
    pub const QUANTITY: &str = "Billing Unit quantity";
    pub const PRICE_PER_HOUR: &str = "Billing Unit price/hr";
    pub const HOURS: &str = "Hours";
    pub const SUBTOTAL: &str = "Subtotal";
    pub const DISCOUNT: &str = "Discount";
    pub const TOTAL_COST: &str = "Total Cost $";

    /// Columns that make up the report group key. All must be present.
    pub const KEY: [&str; 6] = [
        CLUSTER_ID,
        CLUSTER_NAME,
        PLAN_TYPE,
        REGION,
        START_DATE,
        END_DATE,
    ];

    pub const FIXED: [&str; 15] = [
        CLUSTER_ID,
        CLUSTER_NAME,
        PLAN_TYPE,
        REGION,
        START_DATE,
        END_DATE,
        DATABASE_ID,
        CHARGE_TYPE,
        BILLING_UNIT_TYPE,
        QUANTITY,
        PRICE_PER_HOUR,
        HOURS,
        SUBTOTAL,
        DISCOUNT,
        TOTAL_COST,
    ];

    pub fn is_fixed(name: &str) -> bool {
        FIXED.contains(&name)
    }
}

/// One dataset record.
///
/// Text fields hold the cell as written; `None` means the cell was null.
/// Numeric fields may hold non-finite values (`inf`, `NaN` literals in the
/// source), which the serializer turns into JSON null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Cluster id normalized to text (`"123.0"` is stored as `"123"`).
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub plan_type: Option<String>,
    pub region: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Database id as written; see [`Row::database_id_value`].
    pub database_id: Option<String>,
    pub charge_type: Option<String>,
    pub billing_unit_type: Option<String>,
    pub quantity: Option<f64>,
    pub price_per_hour: Option<f64>,
    pub hours: Option<f64>,
    pub subtotal: Option<f64>,
    pub discount: Option<f64>,
    pub total_cost: Option<f64>,
    /// Cells of the non-fixed columns, aligned with [`Table::dynamic_columns`].
    pub(crate) dynamic: Vec<Option<String>>,
}

impl Row {
    /// Numeric value of the database id, if the cell holds a number.
    pub fn database_id_value(&self) -> Option<f64> {
        self.database_id.as_deref()?.trim().parse().ok()
    }

    /// Cell of a dynamic column by its position in [`Table::dynamic_columns`].
    pub fn dynamic_cell(&self, index: usize) -> Option<&str> {
        self.dynamic.get(index)?.as_deref()
    }
}

/// A tag column discovered in the table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagColumn<'a> {
    pub name: &'a str,
    index: usize,
}

impl<'a> TagColumn<'a> {
    /// The row's value for this tag, or `None` when the cell is null.
    pub fn value<'r>(&self, row: &'r Row) -> Option<&'r str> {
        row.dynamic_cell(self.index)
    }
}

/// The loaded dataset: the header and every row, in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    dynamic_columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column headers, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Headers of the columns outside the fixed schema, in file order.
    pub fn dynamic_columns(&self) -> &[String] {
        &self.dynamic_columns
    }

    /// Scan the header for tag columns.
    ///
    /// Runs per query so that new tag columns need no code change.
    pub fn tag_columns(&self) -> Vec<TagColumn<'_>> {
        self.dynamic_columns
            .iter()
            .enumerate()
            .filter(|(_, name)| is_tag_column(name))
            .map(|(index, name)| TagColumn { name, index })
            .collect()
    }

    /// Look up a single tag column by header name.
    pub fn tag_column(&self, name: &str) -> Option<TagColumn<'_>> {
        self.tag_columns().into_iter().find(|c| c.name == name)
    }
}

/// Dataset load failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("CSV file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read CSV file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column '{0}' is missing from the CSV header")]
    MissingColumn(String),

    #[error("Line {line}: column '{column}' holds non-numeric value '{value}'")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },
}

/// Process-wide holder of the dataset.
///
/// Constructed once before the server accepts traffic and never mutated
/// afterwards.
#[derive(Debug)]
pub enum TableStore {
    Loaded(Table),
    Unavailable(LoadError),
}

impl TableStore {
    /// Load the dataset named by the config, logging the outcome.
    ///
    /// Never fails: a load error is kept as [`TableStore::Unavailable`] so the
    /// service can start and report the condition per request.
    pub fn open(config: &DatasetConfig) -> Self {
        let path = config.path_buf();
        match Table::from_path(&path) {
            Ok(table) => {
                tracing::info!(
                    path = %path.display(),
                    rows = table.len(),
                    columns = ?table.columns(),
                    "Dataset loaded"
                );
                Self::Loaded(table)
            }
            Err(error) => {
                tracing::error!(
                    path = %path.display(),
                    error = %error,
                    "Failed to load dataset; report queries will be rejected until restart"
                );
                Self::Unavailable(error)
            }
        }
    }

    pub fn table(&self) -> Result<&Table, &LoadError> {
        match self {
            Self::Loaded(table) => Ok(table),
            Self::Unavailable(error) => Err(error),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Number of rows held, zero when unavailable.
    pub fn row_count(&self) -> usize {
        self.table().map_or(0, Table::len)
    }
}

impl From<Table> for TableStore {
    fn from(table: Table) -> Self {
        Self::Loaded(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Cluster id,Cluster name,Plan Type,Region,Start date,End date,Database id,Charge Type,Total Cost $,key1:value,owner,key2:value
101,alpha,Pro,us-east-1,2024-01-01,2024-01-31,100.0,compute,12.5,team-a,ops,
";

    #[test]
    fn test_tag_columns_scanned_from_header() {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();

        let names: Vec<&str> = table.tag_columns().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["key1:value", "key2:value"]);
        assert_eq!(table.dynamic_columns(), &["key1:value", "owner", "key2:value"]);
    }

    #[test]
    fn test_tag_column_value_lookup() {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();
        let row = &table.rows()[0];

        let tag1 = table.tag_column("key1:value").unwrap();
        let tag2 = table.tag_column("key2:value").unwrap();
        assert_eq!(tag1.value(row), Some("team-a"));
        assert_eq!(tag2.value(row), None);
        assert!(table.tag_column("owner").is_none());
        assert!(table.tag_column("key9:value").is_none());
    }

    #[test]
    fn test_database_id_value() {
        let row = Row {
            database_id: Some("100.0".to_string()),
            ..Default::default()
        };
        assert_eq!(row.database_id_value(), Some(100.0));

        let row = Row {
            database_id: Some("db-7".to_string()),
            ..Default::default()
        };
        assert_eq!(row.database_id_value(), None);
    }

    #[test]
    fn test_store_unavailable_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            path: dir.path().join("absent.csv").display().to_string(),
            ..Default::default()
        };

        let store = TableStore::open(&config);
        assert!(!store.is_loaded());
        assert_eq!(store.row_count(), 0);
        assert!(matches!(store.table(), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_store_loaded_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_report.csv");
        std::fs::write(&path, CSV).unwrap();
        let config = DatasetConfig {
            path: path.display().to_string(),
            ..Default::default()
        };

        let store = TableStore::open(&config);
        assert!(store.is_loaded());
        assert_eq!(store.row_count(), 1);
    }
}
