//! Report query pipeline.
//!
//! A query runs in four stages, each with its own result:
//! [`filter::apply`] narrows the table rows, [`group::group`] builds report
//! groups, [`admission::admit_and_order`] enforces the group cap and orders by
//! start date, and [`serialize::serialize`] renders the JSON tree.
//! [`run_report`] composes the first three; the caller serializes.

pub mod admission;
pub mod filter;
pub mod group;
pub mod serialize;

pub use admission::admit_and_order;
pub use filter::{QueryFilter, TagPredicate};
pub use serialize::serialize;

use crate::{
    models::ReportResponse,
    table::{LoadError, TableStore},
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Dataset unavailable: {reason}")]
    DatasetUnavailable { reason: String },

    #[error("{found} report groups match the query, more than the allowed {limit}")]
    RowLimitExceeded { limit: usize, found: usize },

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<&LoadError> for ReportError {
    fn from(error: &LoadError) -> Self {
        Self::DatasetUnavailable {
            reason: error.to_string(),
        }
    }
}

/// Run a query against the store and return the admitted, ordered groups.
#[tracing::instrument(skip_all, fields(limit = max_groups))]
pub fn run_report(
    store: &TableStore,
    query: &QueryFilter,
    max_groups: usize,
) -> Result<ReportResponse, ReportError> {
    let table = store.table()?;

    let rows = filter::apply(table, query);
    let tag_columns = table.tag_columns();
    let groups = group::group(&rows, &tag_columns);
    tracing::debug!(
        rows = rows.len(),
        groups = groups.len(),
        "Report query matched"
    );

    let groups = admit_and_order(groups, max_groups)?;
    Ok(ReportResponse::new(groups))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::table::Table;

    const CSV: &str = "\
Cluster id,Cluster name,Plan Type,Region,Start date,End date,Database id,Charge Type,Total Cost $,key1:value
1,alpha,Pro,us,2024-01-01,2024-01-31,100.0,compute,10,team-a
2,beta,Pro,us,2024-03-01,2024-03-31,200.0,compute,inf,
3,gamma,Pro,eu,2024-02-01,2024-02-29,300.0,storage,3,team-b
";

    fn store() -> TableStore {
        Table::from_reader(CSV.as_bytes()).unwrap().into()
    }

    fn report_json(query: &QueryFilter, max_groups: usize) -> Value {
        serialize(&run_report(&store(), query, max_groups).unwrap()).unwrap()
    }

    #[test]
    fn test_run_report_orders_and_sanitizes() {
        let value = report_json(&QueryFilter::default(), 10);

        assert_eq!(value["total_rows"], json!(3));
        let starts: Vec<&str> = value["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["start_date"].as_str().unwrap())
            .collect();
        assert_eq!(starts, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);
        assert_eq!(value["data"][0]["charges"][0]["total_cost"], Value::Null);
        assert!(value["data"][0]["charges"][0].get("tags").is_none());
        assert_eq!(
            value["data"][2]["charges"][0]["tags"],
            json!({"key1:value": "team-a"})
        );
    }

    #[test]
    fn test_run_report_no_match_is_empty() {
        let query = QueryFilter {
            region: Some("ap".to_string()),
            ..Default::default()
        };
        let value = report_json(&query, 10);
        assert_eq!(value, json!({"data": [], "total_rows": 0}));
    }

    #[test]
    fn test_run_report_over_limit() {
        let err = run_report(&store(), &QueryFilter::default(), 2).unwrap_err();
        assert!(matches!(
            err,
            ReportError::RowLimitExceeded { limit: 2, found: 3 }
        ));
    }

    #[test]
    fn test_run_report_unavailable_store() {
        let store = TableStore::Unavailable(LoadError::MissingColumn("Region".to_string()));
        let err = run_report(&store, &QueryFilter::default(), 10).unwrap_err();
        assert!(matches!(err, ReportError::DatasetUnavailable { .. }));
    }
}
