//! Group-count cap and start-date ordering.

use std::cmp::Reverse;

use super::ReportError;
use crate::models::{ReportGroup, parse_iso_date};

/// Reject results with more than `limit` groups, otherwise order them by
/// start date, newest first.
///
/// The sort is stable, so groups with equal start dates keep grouping order.
/// Groups whose start date does not parse go after every dated group. When
/// no start date parses at all, grouping order is returned unchanged.
pub fn admit_and_order(
    mut groups: Vec<ReportGroup>,
    limit: usize,
) -> Result<Vec<ReportGroup>, ReportError> {
    if groups.len() > limit {
        return Err(ReportError::RowLimitExceeded {
            limit,
            found: groups.len(),
        });
    }

    let dated = groups
        .iter()
        .filter(|g| parse_iso_date(&g.start_date).is_some())
        .count();
    if dated == 0 {
        if !groups.is_empty() {
            tracing::debug!(
                groups = groups.len(),
                "No start date parses as a calendar date, keeping grouping order"
            );
        }
        return Ok(groups);
    }

    // `None` sorts before `Some`, so reversed it lands last.
    groups.sort_by_cached_key(|g| Reverse(parse_iso_date(&g.start_date)));
    Ok(groups)
}
