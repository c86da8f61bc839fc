//! The usage and cost report endpoint.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde_json::Value;
use validator::Validate;

use super::ApiError;
use crate::{
    AppState,
    config::TagFilterColumns,
    models::{validate_iso_date, validate_numeric_id},
    observability::metrics,
    report::{self, QueryFilter, TagPredicate},
};

/// Parameters that are validated, in the order their errors are reported.
const VALIDATED_FIELDS: [&str; 5] = [
    "account_id",
    "subscription_id",
    "database_id",
    "start_date",
    "end_date",
];

/// Query string of `GET /usage-cost-report`.
#[derive(Debug, Clone, Default, Validate)]
pub struct ReportQuery {
    /// Mandatory. Validated but not used as a filter.
    #[validate(custom(function = "validate_numeric_id"))]
    pub account_id: Option<String>,
    /// Matched against the cluster id column.
    #[validate(custom(function = "validate_numeric_id"))]
    pub subscription_id: Option<String>,
    #[validate(custom(function = "validate_numeric_id"))]
    pub database_id: Option<String>,
    pub plan_type: Option<String>,
    /// Lower bound on the start date, inclusive.
    #[validate(custom(function = "validate_iso_date"))]
    pub start_date: Option<String>,
    /// Upper bound on the end date, inclusive.
    #[validate(custom(function = "validate_iso_date"))]
    pub end_date: Option<String>,
    pub region: Option<String>,
    /// Substring matched against the first tag filter column.
    pub tag1: Option<String>,
    /// Substring matched against the second tag filter column.
    pub tag2: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ReportQuery {
    /// Build from raw query pairs. A repeated parameter keeps its last value
    /// and unknown parameters are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "account_id" => &mut query.account_id,
                "subscription_id" => &mut query.subscription_id,
                "database_id" => &mut query.database_id,
                "plan_type" => &mut query.plan_type,
                "start_date" => &mut query.start_date,
                "end_date" => &mut query.end_date,
                "region" => &mut query.region,
                "tag1" => &mut query.tag1,
                "tag2" => &mut query.tag2,
                _ => continue,
            };
            *slot = Some(value);
        }
        query
    }

    /// Treat blank optional parameters as not supplied.
    ///
    /// Dates are left alone: a blank date is malformed, not absent.
    fn normalized(self) -> Self {
        Self {
            account_id: self.account_id,
            subscription_id: non_blank(self.subscription_id),
            database_id: non_blank(self.database_id),
            plan_type: non_blank(self.plan_type),
            start_date: self.start_date,
            end_date: self.end_date,
            region: non_blank(self.region),
            tag1: non_blank(self.tag1),
            tag2: non_blank(self.tag2),
        }
    }

    /// Validate every parameter, reporting the first failure.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.account_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(ApiError::Validation(
                "account_id parameter is mandatory".to_string(),
            ));
        }

        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let field_errors = errors.field_errors();
        let first = VALIDATED_FIELDS.iter().find_map(|field| {
            field_errors
                .get(*field)
                .and_then(|errs| errs.first())
                .map(|err| (field, err))
        });

        Err(ApiError::Validation(match first {
            Some((field, err)) => match &err.message {
                Some(message) => format!("{field} {message}"),
                None => format!("{field} is invalid"),
            },
            None => errors.to_string(),
        }))
    }

    /// Build the row filter, binding tag parameters to their columns.
    pub fn into_filter(self, tag_columns: &TagFilterColumns) -> QueryFilter {
        let tags = [(self.tag1, &tag_columns.tag1), (self.tag2, &tag_columns.tag2)]
            .into_iter()
            .filter_map(|(needle, column)| {
                needle.map(|needle| TagPredicate {
                    column: column.clone(),
                    needle,
                })
            })
            .collect();

        QueryFilter {
            subscription_id: self.subscription_id,
            database_id: self.database_id,
            plan_type: self.plan_type,
            start_date: self.start_date,
            end_date: self.end_date,
            region: self.region,
            tags,
        }
    }
}

/// Grouped usage and cost report.
///
/// Returns at most `limits.max_report_groups` groups ordered by start date,
/// newest first, or 413 when more groups match.
#[tracing::instrument(name = "report.usage_cost", skip(state, query))]
pub async fn usage_cost_report(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(pairs) = query?;
    let query = ReportQuery::from_pairs(pairs).normalized();
    query.check()?;

    let filter = query.into_filter(&state.config.dataset.tag_filters);
    tracing::debug!(?filter, "Running report query");

    let response = report::run_report(
        &state.store,
        &filter,
        state.config.limits.max_report_groups,
    )?;
    metrics::record_report_served(response.total_rows);

    Ok(Json(report::serialize(&response)?))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ReportQuery {
        ReportQuery::from_pairs(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
        .normalized()
    }

    fn message(result: Result<(), ApiError>) -> Option<String> {
        match result {
            Ok(()) => None,
            Err(ApiError::Validation(msg)) => Some(msg),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case(&[], Some("account_id parameter is mandatory"))]
    #[case(&[("account_id", "  ")], Some("account_id parameter is mandatory"))]
    #[case(&[("account_id", "12a")], Some("account_id must be numeric only"))]
    #[case(&[("account_id", "1"), ("subscription_id", "x")], Some("subscription_id must be numeric only"))]
    #[case(&[("account_id", "1"), ("database_id", "1.5")], Some("database_id must be numeric only"))]
    #[case(&[("account_id", "1"), ("start_date", "2024-13-01")], Some("start_date must be in YYYY-MM-DD format"))]
    #[case(&[("account_id", "1"), ("end_date", "31/01/2024")], Some("end_date must be in YYYY-MM-DD format"))]
    #[case(&[("account_id", "1"), ("start_date", "")], Some("start_date must be in YYYY-MM-DD format"))]
    #[case(&[("account_id", "1"), ("start_date", " 2024-03-01")], Some("start_date must be in YYYY-MM-DD format"))]
    #[case(&[("account_id", "abc"), ("account_id", "1")], None)]
    #[case(&[("account_id", "1"), ("account_id", "abc")], Some("account_id must be numeric only"))]
    #[case(&[("account_id", "1"), ("subscription_id", ""), ("database_id", "")], None)]
    #[case(&[("account_id", " 12345 "), ("start_date", "2024-01-01"), ("end_date", "2024-12-31")], None)]
    fn test_check(#[case] pairs: &[(&str, &str)], #[case] expected: Option<&str>) {
        assert_eq!(message(query(pairs).check()).as_deref(), expected);
    }

    #[test]
    fn test_first_failure_in_parameter_order() {
        let q = query(&[
            ("account_id", "1"),
            ("end_date", "bad"),
            ("database_id", "bad"),
            ("subscription_id", "bad"),
        ]);
        assert_eq!(
            message(q.check()).as_deref(),
            Some("subscription_id must be numeric only")
        );
    }

    #[test]
    fn test_from_pairs_ignores_unknown_parameters() {
        let q = query(&[("account_id", "1"), ("page", "2"), ("region", "eu")]);
        assert_eq!(q.account_id.as_deref(), Some("1"));
        assert_eq!(q.region.as_deref(), Some("eu"));
        assert_eq!(message(q.check()), None);
    }

    #[test]
    fn test_into_filter_binds_tag_columns() {
        let columns = TagFilterColumns {
            tag1: "team:name".to_string(),
            tag2: "env:name".to_string(),
        };
        let filter = query(&[("account_id", "1"), ("tag2", "prod"), ("region", "")])
            .into_filter(&columns);

        assert_eq!(filter.region, None);
        assert_eq!(
            filter.tags,
            vec![TagPredicate {
                column: "env:name".to_string(),
                needle: "prod".to_string(),
            }]
        );
    }
}
