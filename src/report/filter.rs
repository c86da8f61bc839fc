//! Row predicates for a report query.

use crate::table::{Row, Table, TagColumn};

/// Substring predicate on one designated tag column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPredicate {
    /// Header of the tag column to test.
    pub column: String,
    pub needle: String,
}

/// Per-request filter. `None` means the caller did not supply the parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub subscription_id: Option<String>,
    pub database_id: Option<String>,
    pub plan_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub region: Option<String>,
    pub tags: Vec<TagPredicate>,
}

/// A tag predicate bound to the table's column, or inert when the table has
/// no such tag column.
struct BoundTag<'a> {
    predicate: &'a TagPredicate,
    column: Option<TagColumn<'a>>,
}

/// Select the rows matching every active predicate, in table order.
///
/// Never mutates the table; the result borrows from it.
pub fn apply<'t>(table: &'t Table, filter: &QueryFilter) -> Vec<&'t Row> {
    let tags: Vec<BoundTag<'_>> = filter
        .tags
        .iter()
        .map(|predicate| BoundTag {
            predicate,
            column: table.tag_column(&predicate.column),
        })
        .collect();

    for tag in tags.iter().filter(|t| t.column.is_none()) {
        tracing::debug!(
            column = %tag.predicate.column,
            "Tag filter column not present in dataset, ignoring"
        );
    }

    let database_id = filter.database_id.as_deref().map(DatabaseIdMatcher::new);

    table
        .rows()
        .iter()
        .filter(|row| {
            filter
                .subscription_id
                .as_deref()
                .is_none_or(|id| row.cluster_id.as_deref() == Some(id.trim()))
        })
        .filter(|row| database_id.as_ref().is_none_or(|m| m.matches(row)))
        .filter(|row| {
            filter.plan_type.as_deref().is_none_or(|plan| {
                row.plan_type
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase() == plan.to_lowercase())
            })
        })
        .filter(|row| {
            filter
                .start_date
                .as_deref()
                .is_none_or(|from| row.start_date.as_deref().is_some_and(|d| d >= from))
        })
        .filter(|row| {
            filter
                .end_date
                .as_deref()
                .is_none_or(|to| row.end_date.as_deref().is_some_and(|d| d <= to))
        })
        .filter(|row| {
            filter
                .region
                .as_deref()
                .is_none_or(|region| row.region.as_deref() == Some(region))
        })
        .filter(|row| tags.iter().all(|tag| tag.matches(row)))
        .collect()
}

impl BoundTag<'_> {
    fn matches(&self, row: &Row) -> bool {
        match self.column {
            Some(column) => column
                .value(row)
                .is_some_and(|value| value.contains(self.predicate.needle.as_str())),
            None => true,
        }
    }
}

/// Database id comparison: numeric when the filter value parses as a
/// number, text equality otherwise.
enum DatabaseIdMatcher<'a> {
    Numeric(f64),
    Text(&'a str),
}

impl<'a> DatabaseIdMatcher<'a> {
    fn new(value: &'a str) -> Self {
        match value.trim().parse::<f64>() {
            Ok(number) => Self::Numeric(number),
            Err(_) => Self::Text(value.trim()),
        }
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Numeric(expected) => row.database_id_value() == Some(*expected),
            Self::Text(expected) => row.database_id.as_deref().map(str::trim) == Some(*expected),
        }
    }
}
