//! JSON rendering of an admitted report.

use serde_json::Value;

use super::ReportError;
use crate::models::ReportResponse;

/// Render a report as `{"data": [...], "total_rows": N}`.
///
/// Charge fields with no value are left out; non-finite numbers are written
/// as `null` so the tree never holds a NaN or infinity.
pub fn serialize(response: &ReportResponse) -> Result<Value, ReportError> {
    let value = serde_json::to_value(response)?;
    Ok(value)
}
